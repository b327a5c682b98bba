//! Compiler error taxonomy.

use thiserror::Error;

/// Every error the analyzer and emitter can report. Variants are grouped the
/// way they surface: name resolution, typing, semantics, constants, and
/// internal invariant violations (the last abort emission outright).
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    // Name errors
    #[error("undefined identifier `{0}`")]
    UndefinedIdent(String),
    #[error("unknown builtin `{0}`")]
    UnknownBuiltin(String),
    #[error("duplicate declaration `{0}`")]
    DuplicateDecl(String),
    #[error("duplicate type `{0}`")]
    DuplicateType(String),

    // Type errors
    #[error("unresolved type `{0}`")]
    UnresolvedType(String),
    #[error("cannot access field of non-aggregate value")]
    FieldOfNonAggregate,
    #[error("cannot dereference non-pointer value")]
    DerefNonPointer,
    #[error("cannot index non-array value")]
    IndexNonArray,
    #[error("array index is not numeric")]
    NonNumericIndex,
    #[error("no field named `{0}`")]
    NoSuchField(String),
    #[error("no value named `{0}` in enum `{1}`")]
    NoSuchEnumValue(String, String),
    #[error("bare function type used as variable type")]
    BareFnType,
    #[error("cannot infer a type for `{0}`")]
    CannotInfer(String),

    // Semantic errors
    #[error("declaration `{0}` requires an initializer")]
    MissingInitializer(String),
    #[error("module-level initializer must be a compile-time constant")]
    NonConstModuleInit,
    #[error("union tag type must be a user-defined enum")]
    UnionTagNotEnum,
    #[error("enum `{0}` has no value matching union field `{1}`")]
    UnionTagMissingValue(String, String),
    #[error("circular dependency involving `{0}`")]
    CircularDependency(String),
    #[error("function and type declarations must be at module level")]
    NotModuleLevel,

    // Constant errors
    #[error("expression does not reduce to a compile-time constant")]
    NotConstant,

    // Fatal invariants
    #[error("internal error: {0}")]
    Internal(String),
}
