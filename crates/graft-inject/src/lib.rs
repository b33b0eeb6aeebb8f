//! Injection core.
//!
//! A pass is created per compiled method. It wraps the method in a
//! [`MethodInfo`], filters out ineligible methods, asks every registered
//! [`Module`] for its [`Injection`] requests and drives the
//! [`InjectionVisitor`] over the method's graph to splice calls into the
//! codelib.
//!
//! # Example
//!
//! ```ignore
//! use graft_inject::{CodelibEnvironment, GraftConfig, ModulePass, Session, TraceCodelib, TraceModule};
//!
//! let session = Session::new(GraftConfig::default())?;
//! let trace = TraceCodelib::new()?;
//! let factories = vec![TraceModule::factory(&trace)];
//! let codelib = CodelibEnvironment::new(Arc::new(trace));
//! let outcome = ModulePass::new(&session, &codelib, &factories, &mut graph, &unit, &dex).run()?;
//! ```

mod adapter;
mod blacklist;
mod codelib;
mod config;
mod dexfile_env;
mod error;
pub mod injection;
mod method_info;
pub mod metrics;
mod module;
pub mod modules;
mod pass;
mod session;
mod symbols;

pub use adapter::*;
pub use blacklist::*;
pub use codelib::*;
pub use config::*;
pub use dexfile_env::*;
pub use error::*;
pub use injection::{
    GENERIC_TARGET, Injection, InjectionState, InjectionVisitor, Parameter, Placement, Target,
    TargetKind,
};
pub use method_info::*;
pub use module::*;
pub use modules::{TRACE_CODELIB_CLASS, TraceCodelib, TraceModule};
pub use pass::*;
pub use session::*;
pub use symbols::*;
