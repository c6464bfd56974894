//! Makehelper core library.
//!
//! Bridges a build system that compiles one file per process to a single
//! batch `make` run. Each compile, archive, and link call is recorded as a
//! descriptor in the build directory; a final pass aggregates them into
//! Makefile variable blocks and renders a template into the build's
//! `Makefile`.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod descriptor;
pub mod makefile;
pub mod paths;
pub mod preproc;
pub mod recorder;
pub mod runner;
pub mod stage;
pub mod store;
pub mod table;
pub mod template;
