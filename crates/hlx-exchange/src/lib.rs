//! Exchange action submission.
//!
//! [`ExchangeClient`] posts signed actions to `<base>/exchange` and turns the
//! `{status, response}` envelope into a typed result. [`Exchange`] ties the
//! client to an [`hlx_signer::ActionSigner`] and a nonce source so that each
//! operation is one call: fresh nonce, sign, submit.
//!
//! There is no retry. A rejected action must be rebuilt with a new nonce.

pub mod client;
pub mod error;
pub mod exchange;
pub mod response;

pub use client::{build_request_body, interpret_response, ExchangeClient};
pub use error::{ExchangeError, ExchangeResult};
pub use exchange::Exchange;
pub use response::{ExchangeResponse, OrderStatus};
