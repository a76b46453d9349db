//! Message normalization: subject classification, signature stripping and
//! sender parsing, composed by [`normalizer::normalize`].

pub mod classifier;
pub mod normalizer;
pub mod sender;
pub mod signature;

pub use classifier::{Classification, LabelRules, classify};
pub use normalizer::{DEFAULT_SUBJECT, normalize};
pub use sender::parse_sender;
pub use signature::{SignatureTriggers, strip_signature};
