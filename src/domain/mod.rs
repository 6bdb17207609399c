pub mod audit;
pub mod error;
pub mod gateway;
pub mod id;
pub mod money;
pub mod participant;
pub mod signature;
pub mod store;
pub mod transaction;

use std::{future::Future, pin::Pin};

/// Boxed `Send` future returned by the port traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
