//! Open Trivia DB API access: response codes, session tokens and the client.

pub mod client;
pub mod response;
pub mod token;
