//! The runtime contract: helper naming and the prelude header baked into
//! the compiler binary.

use crate::tree::BuiltinOp;
use crate::types::BuiltinType;

/// `tick_<family>_<op>_<type>`, e.g. `tick_checked_add_i32`.
pub fn helper_name(op: BuiltinOp, bt: BuiltinType) -> String {
    let (family, opname) = match op {
        BuiltinOp::SatAdd => ("sat", "add"),
        BuiltinOp::SatSub => ("sat", "sub"),
        BuiltinOp::SatMul => ("sat", "mul"),
        BuiltinOp::SatDiv => ("sat", "div"),
        BuiltinOp::WrapAdd => ("wrap", "add"),
        BuiltinOp::WrapSub => ("wrap", "sub"),
        BuiltinOp::WrapMul => ("wrap", "mul"),
        BuiltinOp::WrapDiv => ("wrap", "div"),
        BuiltinOp::CheckedAdd => ("checked", "add"),
        BuiltinOp::CheckedSub => ("checked", "sub"),
        BuiltinOp::CheckedMul => ("checked", "mul"),
        BuiltinOp::CheckedDiv => ("checked", "div"),
        BuiltinOp::CheckedMod => ("checked", "mod"),
        BuiltinOp::CheckedShl => ("checked", "shl"),
        BuiltinOp::CheckedShr => ("checked", "shr"),
        BuiltinOp::CheckedNeg => ("checked", "neg"),
        BuiltinOp::CheckedCast => ("checked", "cast"),
    };
    format!("tick_{}_{}_{}", family, opname, bt.helper_suffix())
}

/// `tick_checked_cast_<src>_<dst>`.
pub fn cast_helper_name(src: BuiltinType, dst: BuiltinType) -> String {
    format!(
        "tick_checked_cast_{}_{}",
        src.helper_suffix(),
        dst.helper_suffix()
    )
}

/// The fixed prelude every interface file opens with. Declares the integer
/// aliases, the semantic arithmetic helpers, the checked-cast helpers, and
/// the compiler builtins; definitions live in the runtime library the
/// emitted C links against.
pub const PRELUDE: &str = r#"/* tick runtime prelude */
#include <stdint.h>
#include <stddef.h>
#include <stdbool.h>

typedef int8_t i8;
typedef int16_t i16;
typedef int32_t i32;
typedef int64_t i64;
typedef uint8_t u8;
typedef uint16_t u16;
typedef uint32_t u32;
typedef uint64_t u64;
typedef size_t usz;
typedef ptrdiff_t isz;

#if defined(__GNUC__) || defined(__clang__)
#define TICK_PACKED __attribute__((packed))
#define TICK_ALIGNED(n) __attribute__((aligned(n)))
#else
#define TICK_PACKED
#define TICK_ALIGNED(n)
#endif

#define TICK_DECLARE_INT_OPS(T) \
    T tick_checked_add_##T(T a, T b); \
    T tick_checked_sub_##T(T a, T b); \
    T tick_checked_mul_##T(T a, T b); \
    T tick_checked_div_##T(T a, T b); \
    T tick_checked_mod_##T(T a, T b); \
    T tick_checked_shl_##T(T a, T b); \
    T tick_checked_shr_##T(T a, T b); \
    T tick_checked_neg_##T(T a); \
    T tick_wrap_add_##T(T a, T b); \
    T tick_wrap_sub_##T(T a, T b); \
    T tick_wrap_mul_##T(T a, T b); \
    T tick_wrap_div_##T(T a, T b); \
    T tick_sat_add_##T(T a, T b); \
    T tick_sat_sub_##T(T a, T b); \
    T tick_sat_mul_##T(T a, T b); \
    T tick_sat_div_##T(T a, T b);

TICK_DECLARE_INT_OPS(i8)
TICK_DECLARE_INT_OPS(i16)
TICK_DECLARE_INT_OPS(i32)
TICK_DECLARE_INT_OPS(i64)
TICK_DECLARE_INT_OPS(u8)
TICK_DECLARE_INT_OPS(u16)
TICK_DECLARE_INT_OPS(u32)
TICK_DECLARE_INT_OPS(u64)
TICK_DECLARE_INT_OPS(isz)
TICK_DECLARE_INT_OPS(usz)

#define TICK_DECLARE_CASTS(S) \
    i8 tick_checked_cast_##S##_i8(S v); \
    i16 tick_checked_cast_##S##_i16(S v); \
    i32 tick_checked_cast_##S##_i32(S v); \
    i64 tick_checked_cast_##S##_i64(S v); \
    u8 tick_checked_cast_##S##_u8(S v); \
    u16 tick_checked_cast_##S##_u16(S v); \
    u32 tick_checked_cast_##S##_u32(S v); \
    u64 tick_checked_cast_##S##_u64(S v); \
    isz tick_checked_cast_##S##_isz(S v); \
    usz tick_checked_cast_##S##_usz(S v);

TICK_DECLARE_CASTS(i8)
TICK_DECLARE_CASTS(i16)
TICK_DECLARE_CASTS(i32)
TICK_DECLARE_CASTS(i64)
TICK_DECLARE_CASTS(u8)
TICK_DECLARE_CASTS(u16)
TICK_DECLARE_CASTS(u32)
TICK_DECLARE_CASTS(u64)
TICK_DECLARE_CASTS(isz)
TICK_DECLARE_CASTS(usz)

void tick_debug_log(const char *fmt, ...);
void tick_panic(const char *fmt, ...);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helper_names() {
        assert_eq!(
            helper_name(BuiltinOp::CheckedAdd, BuiltinType::I32),
            "tick_checked_add_i32"
        );
        assert_eq!(
            helper_name(BuiltinOp::WrapSub, BuiltinType::I64),
            "tick_wrap_sub_i64"
        );
        assert_eq!(
            helper_name(BuiltinOp::SatMul, BuiltinType::U32),
            "tick_sat_mul_u32"
        );
        assert_eq!(
            helper_name(BuiltinOp::CheckedNeg, BuiltinType::I16),
            "tick_checked_neg_i16"
        );
    }

    #[test]
    fn cast_helper_names() {
        assert_eq!(
            cast_helper_name(BuiltinType::I64, BuiltinType::I32),
            "tick_checked_cast_i64_i32"
        );
    }
}
