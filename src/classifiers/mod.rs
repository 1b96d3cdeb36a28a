//! Rule and signature classifiers.
//!
//! Every classifier is a pure function of the homepage markup and the probe
//! results; none of them touch the network or keep state, so running one
//! twice on the same input yields the same [`Verdict`](crate::models::Verdict).

pub mod chain;
pub mod cms;
pub mod keywords;
pub mod notices;
pub mod paywall;
pub mod pdf;
pub mod privacy;
pub mod responsive;
pub mod signatures;

pub use chain::{INDEPENDENT, detect_chain, detected_chain};
pub use cms::{CmsLabels, detect_cms};
pub use notices::detect_notices;
pub use paywall::detect_paywall;
pub use pdf::{PdfVerdict, detect_pdf};
pub use privacy::detect_privacy;
pub use responsive::detect_responsive;
