//! A typed-value core and time-series runtime for a reactive dataflow graph
//! (`spec.md`): scalar/bundle/tuple/list/set/map/cyclic-buffer/queue/
//! reference container storage (§3, §4.A-§4.C), a time-series overlay tree
//! tracking modification timestamps, observers, and deltas on top of it
//! (§4.D-§4.G), and the input/output binding machine connecting nodes in a
//! dataflow graph through access strategies (§4.H-§4.I).

#![warn(missing_docs)]

pub mod config;
pub mod container;
pub mod error;
pub mod io;
pub mod observer;
pub mod overlay;
pub mod path;
pub mod scheduler;
pub mod strategy;
pub mod time;
pub mod ts_meta;
pub mod ts_value;
pub mod type_meta;
pub mod value;
pub mod view;

pub use config::Config;
pub use error::{Error, Result};
pub use io::{TSInput, TSOutput};
pub use path::{Path, PathElement};
pub use scheduler::{register_delta_reset_callback, run_delta_reset_callbacks};
pub use time::{Clock, Time};
pub use ts_meta::{dereference, ts_bundle, ts_dict, ts_list, ts_ref, ts_scalar, ts_set, ts_signal, ts_window, TSMeta, TsKind, WindowBound};
pub use ts_value::{TSValue, TSView};
pub use type_meta::{default_value, register, TypeDescriptor, TypeMeta};
pub use value::{Scalar, Value};
