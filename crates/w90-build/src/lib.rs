//! Build pipeline for the `libwannier90` Python extension.
//!
//! Probes BLAS/LAPACK on the host, builds the vendored wannier90 tree with its
//! own makefiles, compiles the pybind11 binding against it and stages the
//! resulting module for distribution.

pub mod config;
pub mod error;
pub mod extension;
pub mod findup;
pub mod os;
pub mod package;
pub mod pipeline;
pub mod probe;
pub mod python;
pub mod sh;
pub mod vendor;

pub use config::BuildConfig;
pub use error::BuildError;
pub use os::OsFamily;
pub use pipeline::Pipeline;
