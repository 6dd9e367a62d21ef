//! Type representation and value checking.
//!
//! A [`YangType`] starts life as an unresolved reference (base
//! [`TypeBase::Unknown`], payload [`TypeInfo::Raw`]) and is rewritten by
//! the resolver into its final shape: the effective base type plus the
//! merged restrictions of the whole derivation chain. Sealed modules
//! never contain unresolved types.

use crate::dict::Sym;
use crate::error::{YangError, YangResult};
use crate::schema::{ModuleId, NodeId};

/// Built-in base types of RFC 6020 §4.2.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeBase {
    /// Not yet resolved against the typedef scope
    Unknown,
    Binary,
    Bits,
    Bool,
    Dec64,
    Empty,
    Enum,
    Ident,
    Inst,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Leafref,
    String,
    Union,
}

impl TypeBase {
    /// Map a built-in type name to its base, or `None` for derived names.
    pub fn from_builtin(name: &str) -> Option<TypeBase> {
        Some(match name {
            "binary" => TypeBase::Binary,
            "bits" => TypeBase::Bits,
            "boolean" => TypeBase::Bool,
            "decimal64" => TypeBase::Dec64,
            "empty" => TypeBase::Empty,
            "enumeration" => TypeBase::Enum,
            "identityref" => TypeBase::Ident,
            "instance-identifier" => TypeBase::Inst,
            "int8" => TypeBase::Int8,
            "int16" => TypeBase::Int16,
            "int32" => TypeBase::Int32,
            "int64" => TypeBase::Int64,
            "uint8" => TypeBase::Uint8,
            "uint16" => TypeBase::Uint16,
            "uint32" => TypeBase::Uint32,
            "uint64" => TypeBase::Uint64,
            "leafref" => TypeBase::Leafref,
            "string" => TypeBase::String,
            "union" => TypeBase::Union,
            _ => return None,
        })
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            TypeBase::Int8
                | TypeBase::Int16
                | TypeBase::Int32
                | TypeBase::Int64
                | TypeBase::Uint8
                | TypeBase::Uint16
                | TypeBase::Uint32
                | TypeBase::Uint64
        )
    }

    /// Inclusive value bounds of an integer base.
    pub fn integer_bounds(self) -> Option<(i128, i128)> {
        Some(match self {
            TypeBase::Int8 => (i8::MIN as i128, i8::MAX as i128),
            TypeBase::Int16 => (i16::MIN as i128, i16::MAX as i128),
            TypeBase::Int32 => (i32::MIN as i128, i32::MAX as i128),
            TypeBase::Int64 => (i64::MIN as i128, i64::MAX as i128),
            TypeBase::Uint8 => (0, u8::MAX as i128),
            TypeBase::Uint16 => (0, u16::MAX as i128),
            TypeBase::Uint32 => (0, u32::MAX as i128),
            TypeBase::Uint64 => (0, u64::MAX as i128),
            _ => return None,
        })
    }
}

/// Reference to an identity within a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentRef {
    pub module: ModuleId,
    pub index: usize,
}

/// A range or length restriction, kept in source form for printing and
/// re-parsed on demand for checking.
#[derive(Debug, Clone)]
pub struct Restr {
    pub expr: Sym,
    pub dsc: Option<Sym>,
    pub reference: Option<Sym>,
    pub emsg: Option<Sym>,
    pub eapptag: Option<Sym>,
}

/// A `pattern` restriction; matching is not evaluated during load, only
/// the statement structure is kept.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub expr: Sym,
    pub dsc: Option<Sym>,
    pub reference: Option<Sym>,
    pub emsg: Option<Sym>,
    pub eapptag: Option<Sym>,
}

#[derive(Debug, Clone)]
pub struct EnumValue {
    pub name: Sym,
    pub dsc: Option<Sym>,
    pub reference: Option<Sym>,
    pub value: i32,
    /// true when the value was auto-assigned rather than written
    pub auto: bool,
}

#[derive(Debug, Clone)]
pub struct Bit {
    pub name: Sym,
    pub dsc: Option<Sym>,
    pub reference: Option<Sym>,
    pub pos: u32,
    /// true when the position was auto-assigned rather than written
    pub auto: bool,
}

/// Substatements of a `type` as parsed, before the base is known.
#[derive(Debug, Clone, Default)]
pub struct RawTypeSpec {
    pub range: Option<Restr>,
    pub length: Option<Restr>,
    pub patterns: Vec<Pattern>,
    pub fraction_digits: Option<u8>,
    pub enums: Vec<EnumValue>,
    pub bits: Vec<Bit>,
    pub path: Option<Sym>,
    pub require_instance: Option<bool>,
    pub ident_base: Option<Sym>,
    pub union_types: Vec<YangType>,
}

impl RawTypeSpec {
    pub fn is_plain(&self) -> bool {
        self.range.is_none()
            && self.length.is_none()
            && self.patterns.is_empty()
            && self.fraction_digits.is_none()
            && self.enums.is_empty()
            && self.bits.is_empty()
            && self.path.is_none()
            && self.require_instance.is_none()
            && self.ident_base.is_none()
            && self.union_types.is_empty()
    }
}

/// Base-specific payload of a resolved type.
#[derive(Debug, Clone)]
pub enum TypeInfo {
    /// Parsed but unresolved substatements
    Raw(Box<RawTypeSpec>),
    /// boolean and empty carry nothing
    None,
    Binary {
        length: Option<Restr>,
    },
    Bits {
        bits: Vec<Bit>,
    },
    Dec64 {
        digits: u8,
        divisor: i64,
        range: Option<Restr>,
    },
    Enumeration {
        enums: Vec<EnumValue>,
    },
    Identityref {
        base_name: Option<Sym>,
        base: Option<IdentRef>,
    },
    InstanceId {
        require_instance: bool,
    },
    Leafref {
        path: Sym,
        require_instance: bool,
        target: Option<NodeId>,
    },
    Num {
        range: Option<Restr>,
    },
    Str {
        length: Option<Restr>,
        patterns: Vec<Pattern>,
    },
    Union {
        types: Vec<YangType>,
    },
}

/// A `type` reference together with its resolved shape.
///
/// `info` holds the effective payload with the derivation chain merged
/// in; `local` keeps the restrictions exactly as written on this
/// reference, which is what the printers emit.
#[derive(Debug, Clone)]
pub struct YangType {
    /// Local part of the name as written (`string`, `my-type`, ...)
    pub name: Sym,
    /// Prefix part of the reference, if any (`inet` in `inet:host`)
    pub prefix: Option<Sym>,
    pub base: TypeBase,
    pub info: TypeInfo,
    pub local: Box<RawTypeSpec>,
}

impl YangType {
    pub fn new(name: Sym, prefix: Option<Sym>, spec: RawTypeSpec) -> Self {
        YangType {
            name,
            prefix,
            base: TypeBase::Unknown,
            local: Box::new(spec.clone()),
            info: TypeInfo::Raw(Box::new(spec)),
        }
    }

    /// Stand-in value for take-and-put-back editing in the resolver.
    pub(crate) fn placeholder() -> Self {
        YangType {
            name: Sym::detached(""),
            prefix: None,
            base: TypeBase::Unknown,
            local: Box::default(),
            info: TypeInfo::None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.base != TypeBase::Unknown
    }

    /// true when the type names a built-in rather than a typedef
    pub fn is_builtin_name(&self) -> bool {
        self.prefix.is_none() && TypeBase::from_builtin(&self.name).is_some()
    }
}

/// One piece of a parsed range/length expression; `None` bounds stand
/// for the `min`/`max` keywords.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangePart {
    pub lo: RangeVal,
    pub hi: RangeVal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeVal {
    Min,
    Max,
    /// Integers, lengths, and decimal64 values scaled by the divisor
    Scaled(i128),
}

/// Parse a `range`/`length` argument: `part ("|" part)*`, where a part
/// is a value or `lo .. hi` and values may be `min`/`max`.
/// `digits` is `Some` for decimal64 (values are scaled by `10^digits`).
pub fn parse_range_expr(expr: &str, digits: Option<u8>) -> YangResult<Vec<RangePart>> {
    let mut parts = Vec::new();
    for piece in expr.split('|') {
        let piece = piece.trim();
        if piece.is_empty() {
            return Err(YangError::InvalidRange(format!("empty part in \"{expr}\"")));
        }
        let (lo, hi) = match piece.split_once("..") {
            Some((l, h)) => (
                parse_range_val(l.trim(), digits, expr)?,
                parse_range_val(h.trim(), digits, expr)?,
            ),
            None => {
                let v = parse_range_val(piece, digits, expr)?;
                (v, v)
            }
        };
        parts.push(RangePart { lo, hi });
    }
    Ok(parts)
}

fn parse_range_val(s: &str, digits: Option<u8>, expr: &str) -> YangResult<RangeVal> {
    match s {
        "min" => Ok(RangeVal::Min),
        "max" => Ok(RangeVal::Max),
        _ => match digits {
            Some(d) => parse_dec64(s, d)
                .map(RangeVal::Scaled)
                .ok_or_else(|| YangError::InvalidRange(format!("bad value {s:?} in \"{expr}\""))),
            None => s
                .parse::<i128>()
                .map(RangeVal::Scaled)
                .map_err(|_| YangError::InvalidRange(format!("bad value {s:?} in \"{expr}\""))),
        },
    }
}

/// Check a range expression against the base type's bounds: parts and
/// bounds must be ascending and inside `[lo, hi]`.
pub fn check_range_expr(
    expr: &str,
    lo: i128,
    hi: i128,
    digits: Option<u8>,
) -> YangResult<()> {
    let parts = parse_range_expr(expr, digits)?;
    let mut prev: Option<i128> = None;
    for part in &parts {
        let plo = match part.lo {
            RangeVal::Min => lo,
            RangeVal::Max => hi,
            RangeVal::Scaled(v) => v,
        };
        let phi = match part.hi {
            RangeVal::Min => lo,
            RangeVal::Max => hi,
            RangeVal::Scaled(v) => v,
        };
        if plo > phi {
            return Err(YangError::InvalidRange(format!(
                "descending part in \"{expr}\""
            )));
        }
        if plo < lo || phi > hi {
            return Err(YangError::InvalidRange(format!(
                "\"{expr}\" exceeds the base type bounds {lo}..{hi}"
            )));
        }
        if let Some(p) = prev {
            if plo <= p {
                return Err(YangError::InvalidRange(format!(
                    "unordered parts in \"{expr}\""
                )));
            }
        }
        prev = Some(phi);
    }
    Ok(())
}

/// true when `value` falls inside the (already validated) expression
pub fn range_contains(parts: &[RangePart], lo: i128, hi: i128, value: i128) -> bool {
    parts.iter().any(|p| {
        let plo = match p.lo {
            RangeVal::Min => lo,
            RangeVal::Max => hi,
            RangeVal::Scaled(v) => v,
        };
        let phi = match p.hi {
            RangeVal::Min => lo,
            RangeVal::Max => hi,
            RangeVal::Scaled(v) => v,
        };
        value >= plo && value <= phi
    })
}

/// Parse a decimal64 literal into its scaled integer representation.
/// `digits` is the fraction-digits count, so `"2.5"` with digits 2
/// becomes 250.
pub fn parse_dec64(s: &str, digits: u8) -> Option<i128> {
    let s = s.trim();
    let (neg, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if body.is_empty() {
        return None;
    }
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, f),
        None => (body, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if frac_part.len() > digits as usize {
        return None;
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    let int_val: i128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().ok()?
    };
    let mut frac_val: i128 = if frac_part.is_empty() {
        0
    } else {
        frac_part.parse().ok()?
    };
    for _ in frac_part.len()..digits as usize {
        frac_val = frac_val.checked_mul(10)?;
    }
    let divisor = 10i128.checked_pow(digits as u32)?;
    let scaled = int_val.checked_mul(divisor)?.checked_add(frac_val)?;
    let scaled = if neg { -scaled } else { scaled };
    // decimal64 is an i64 quantity after scaling
    if scaled < i64::MIN as i128 || scaled > i64::MAX as i128 {
        return None;
    }
    Some(scaled)
}

/// Inclusive scaled bounds of a decimal64 with the given fraction digits.
pub fn dec64_bounds() -> (i128, i128) {
    (i64::MIN as i128, i64::MAX as i128)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        assert_eq!(TypeBase::from_builtin("string"), Some(TypeBase::String));
        assert_eq!(TypeBase::from_builtin("decimal64"), Some(TypeBase::Dec64));
        assert_eq!(TypeBase::from_builtin("my-type"), None);
    }

    #[test]
    fn test_range_parsing() {
        let parts = parse_range_expr("1..10 | 15", None).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].lo, RangeVal::Scaled(1));
        assert_eq!(parts[1].hi, RangeVal::Scaled(15));
        assert!(parse_range_expr("min..max", None).is_ok());
        assert!(parse_range_expr("1..x", None).is_err());
    }

    #[test]
    fn test_range_checking() {
        assert!(check_range_expr("1..10", 0, 255, None).is_ok());
        assert!(check_range_expr("10..1", 0, 255, None).is_err());
        assert!(check_range_expr("1..300", 0, 255, None).is_err());
        assert!(check_range_expr("1..5 | 4..8", 0, 255, None).is_err());
    }

    #[test]
    fn test_dec64() {
        assert_eq!(parse_dec64("2.5", 2), Some(250));
        assert_eq!(parse_dec64("-0.05", 2), Some(-5));
        assert_eq!(parse_dec64("3", 1), Some(30));
        assert_eq!(parse_dec64("1.234", 2), None);
        assert_eq!(parse_dec64("abc", 2), None);
    }
}
