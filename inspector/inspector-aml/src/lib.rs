//! # AML Loader and Static Evaluator
//!
//! Parses the definition blocks of the DSDT and SSDTs into one namespace and
//! evaluates the parts of it that do not depend on hardware state.
//!
//! ## Pipeline
//!
//! 1. [`Context::load_table`] decodes a table with the recursive-descent
//!    parser. Named objects are registered in the [`Namespace`] as they are
//!    read; every term lands in the [`Tree`] arena.
//! 2. Packages that refer to names defined later are kept as
//!    [`Term::Deferred`] and parsed again by [`Context::expand_deferred`]
//!    once every table is in.
//! 3. The [`Interpreter`] evaluates named objects and method calls. What it
//!    cannot know statically comes back as an [`Unresolved`] reason rather
//!    than an error.
//! 4. [`ConditionallyUnregister`] drops devices whose `_STA` is 0 and
//!    objects in `If` branches that are never taken.
//! 5. [`extract_devices`] collects identification, resources and interrupt
//!    routing of what is left.
//!
//! ```no_run
//! # fn run(dsdt: &[u8]) -> Result<(), inspector_aml::AmlError> {
//! use inspector_aml::{ConditionallyUnregister, Context, extract_devices};
//!
//! let mut ctx = Context::new();
//! ctx.load_tables([("DSDT", dsdt)])?;
//! ConditionallyUnregister::run(&mut ctx);
//! for device in extract_devices(&mut ctx, true) {
//!     println!("{} {:?}", device.path, device.hid);
//! }
//! # Ok(())
//! # }
//! ```

mod context;
mod device;
mod error;
mod interpreter;
pub mod name;
pub mod namespace;
pub mod opcode;
mod parser;
pub mod pkglength;
pub mod prt;
pub mod stream;
pub mod tree;
pub mod value;
pub mod visitor;

pub use context::Context;
pub use device::{DeviceInfo, eisa_id, extract_devices};
pub use error::AmlError;
pub use interpreter::{Interpreter, MAX_BUFFER_LEN, MAX_CALL_DEPTH, MAX_PACKAGE_LEN, WHILE_BUDGET};
pub use name::{NameSeg, NameString};
pub use namespace::{Namespace, NodeId, ObjectKind};
pub use prt::{PrtEntry, RoutingSource};
pub use tree::{Term, Tree, TreeId};
pub use value::{Unresolved, Value};
pub use visitor::{ConditionallyUnregister, Visitor};
