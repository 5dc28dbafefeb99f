//! Client library for connecting to greeterd.
//!
//! Provides [`GreetClient`], a thin wrapper over the generated gRPC stub
//! that bounds every step with a deadline, and [`greet_once`], which runs
//! the whole connect-and-call exchange under a single deadline.

mod greet_client;

pub use greet_client::{ClientConfig, DEFAULT_DEADLINE, GreetClient, greet_once};
