//! Concrete tables built on top of the engine
//! - MetadataTable (key/value storage about the database itself)
//! - CommentTable (record storage with validated typed-name columns)
//!

//  All modules of this lib
mod comment;
mod metadata;

//  External API
pub use comment::{Comment, CommentTable};
pub use metadata::MetadataTable;

pub mod validators {
    //! Stock predicates for "thing names": every stored thing carries a
    //! name of the form `t<typecode>_<id>`.

    use crate::engine::Predicate;
    use crate::error::EngineResult;

    pub fn typed_name(type_code: u32) -> EngineResult<Predicate> {
        Predicate::matches(&format!("^t{}_[a-z0-9]+$", type_code))
    }

    /// Any typed name, regardless of typecode.
    pub fn any_name() -> EngineResult<Predicate> {
        Predicate::matches("^t[0-9]+_[a-z0-9]+$")
    }

    pub fn comment_name() -> EngineResult<Predicate> {
        typed_name(1)
    }

    pub fn account_name() -> EngineResult<Predicate> {
        typed_name(2)
    }

    pub fn article_name() -> EngineResult<Predicate> {
        typed_name(3)
    }

    pub fn message_name() -> EngineResult<Predicate> {
        typed_name(4)
    }
}
