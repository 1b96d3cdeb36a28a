//! Output of audit results.
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── example-gazette_com_141503.json
//!     └── example-times_com_141507.json
//! ```

pub mod json;
