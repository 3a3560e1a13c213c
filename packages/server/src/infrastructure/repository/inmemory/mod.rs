mod queue;

pub use queue::InMemoryQueueRepository;
