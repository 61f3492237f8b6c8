pub mod boxes;
pub mod cursor;
pub mod error;
pub mod fields;
pub mod known_boxes;
pub mod movie;
pub mod parser;
pub mod registry;
pub mod report;
pub mod util;

pub use boxes::{BoxBody, BoxHeader, BoxKey, BoxTree, BoxView, FourCC, FullBoxHeader, NodeId};
pub use error::{ErrorKind, ParseError};
pub use fields::{Entry, Field, FieldSource, FieldValue};
pub use parser::{BoxReader, ParseOptions, Parser, parse, read_box_header};
pub use registry::{BoxDecoder, Registry, default_registry};
pub use report::{Analysis, JsonBox, analyze_file, build_json, json_tree, render_text};
