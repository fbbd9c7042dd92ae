mod common;
mod completeness;
