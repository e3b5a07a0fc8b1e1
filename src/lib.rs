//! `xmmvec` explores the conditional probabilities of co-occurrence between the features
//! of two omics, as estimated by tools such as mmvec.
//!
//! A score matrix (omic1 features as columns, omic2 features as rows) is filtered by an
//! optional metadata table per omic, floored at a minimum probability, ranked globally and
//! per feature, and rendered as a single interactive HTML page.
//!
//! ```no_run
//! use xmmvec::RunArgs;
//!
//! let args = RunArgs { ranks: "ranks.tsv".into(), min_probability: 0.1, ..Default::default() };
//! let output = xmmvec::run(&args)?;
//! # Ok::<(), color_eyre::eyre::Report>(())
//! ```

#[cfg(feature = "cli")]
pub mod cli;
pub mod error;
pub mod long_form;
pub mod matrix;
pub mod metadata;
pub mod rank;
pub mod run;
pub mod utils;
pub mod view;

#[doc(inline)]
#[cfg(feature = "cli")]
pub use crate::cli::Cli;
#[doc(inline)]
pub use crate::error::{Error, ErrorKind};
#[doc(inline)]
pub use crate::long_form::LongForm;
#[doc(inline)]
pub use crate::matrix::ScoreMatrix;
#[doc(inline)]
pub use crate::run::{run, RunArgs};
#[doc(inline)]
pub use xmmvec_table::Table;
