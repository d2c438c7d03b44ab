pub mod account;

pub use account::InMemoryAccountRepository;
