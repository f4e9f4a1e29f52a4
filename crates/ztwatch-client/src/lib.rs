//! ztwatch-client — HTTP collaborators of the ztwatch monitor.
//!
//! - `ZeroTierClient` lists members from ZeroTier Central and looks up
//!   the latest ZeroTierOne release on GitHub (`MemberSource`).
//! - `TelegramSink` delivers report text through the Bot API
//!   (`ReportSink`).
//!
//! All requests share one `HttpClient`: a pooled reqwest client with a
//! per-request timeout and retries with exponential backoff plus jitter.

pub mod error;
pub mod http;
pub mod telegram;
pub mod zerotier;

pub use error::{ClientError, ClientResult, Exhausted};
pub use http::{HttpClient, RetryPolicy};
pub use telegram::TelegramSink;
pub use zerotier::ZeroTierClient;
