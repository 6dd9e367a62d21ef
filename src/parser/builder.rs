//! Second parsing layer: statement tree to module under construction.
//!
//! The builder enforces the statement cardinality and context rules,
//! allocates schema nodes into the arena, and records every forward
//! reference (imports, types, groupings, augment and deviation targets,
//! if-features, keys, uniques, choice defaults) as an unresolved entry
//! for the resolver to settle.

use log::{debug, warn};

use crate::context::Context;
use crate::dict::Sym;
use crate::error::{YangError, YangResult};
use crate::parser::statement::{Keyword, Statement};
use crate::resolver::{IffTarget, TypeOwner, Unres, UnresItem};
use crate::schema::node::{
    self, AnyXmlBody, AugmentBody, CaseBody, ChoiceBody, ContainerBody, GroupingBody, InOutBody,
    LeafBody, LeafListBody, ListBody, Must, NodeKind, NotifBody, Refine, RpcBody, SchemaNode,
    Status, UsesBody, When, NACM_DENY_ALL, NACM_DENY_WRITE,
};
use crate::schema::typ::{Bit, EnumValue, Pattern, RawTypeSpec, Restr, YangType};
use crate::schema::{
    Deviate, DeviateKind, Deviation, Feature, Identity, Import, Include, ModuleId, ModuleKind,
    NodeId, Revision, Typedef, YangVersion,
};

/// Populate the pre-allocated module slot `mid` from the statement tree.
pub(crate) fn build_module(
    ctx: &mut Context,
    mid: ModuleId,
    stmt: &Statement,
    unres: &mut Unres,
) -> YangResult<()> {
    let name = arg_identifier(stmt)?;
    let submodule = stmt.keyword == Keyword::Submodule;
    let owner = match ctx.module(mid).kind {
        ModuleKind::Submodule { belongs_to } => Some(belongs_to),
        ModuleKind::Module => None,
    };
    if submodule != owner.is_some() {
        return Err(YangError::UnexpectedStatementInContext(format!(
            "{} text where a {} was expected",
            stmt.keyword,
            if owner.is_some() { "submodule" } else { "module" },
        )));
    }

    let name = ctx.intern(name);
    ctx.module_mut(mid).name = name.clone();

    let mut ns = None;
    let mut prefix = None;
    let mut version = None;
    let mut org = None;
    let mut contact = None;
    let mut dsc = None;
    let mut reference = None;
    let mut belongs_seen = false;
    let mut revisions: Vec<Revision> = Vec::new();

    for child in &stmt.children {
        match &child.keyword {
            Keyword::YangVersion => {
                let v = match child.arg_str() {
                    "1" => YangVersion::V1,
                    "1.1" => YangVersion::V1_1,
                    other => {
                        return Err(YangError::InvalidValue(format!(
                            "yang-version {other:?} on line {}",
                            child.line
                        )))
                    }
                };
                set_once(&mut version, v, "yang-version", child.line)?;
            }
            Keyword::Namespace if !submodule => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut ns, v, "namespace", child.line)?;
            }
            Keyword::Prefix if !submodule => {
                let v = ctx.intern(arg_identifier(child)?);
                set_once(&mut prefix, v, "prefix", child.line)?;
            }
            Keyword::BelongsTo if submodule => {
                if belongs_seen {
                    return Err(YangError::DuplicateStatement(format!(
                        "belongs-to on line {}",
                        child.line
                    )));
                }
                belongs_seen = true;
                let owner_id = owner.ok_or_else(|| {
                    YangError::Internal("submodule slot without an owner".to_string())
                })?;
                if ctx.module(owner_id).name != arg_identifier(child)? {
                    return Err(YangError::InvalidValue(format!(
                        "submodule {name} belongs to {:?}, included by {}",
                        child.arg_str(),
                        ctx.module(owner_id).name
                    )));
                }
                let pfx_stmt = child.find(&Keyword::Prefix).ok_or_else(|| {
                    YangError::MissingRequiredChild(format!(
                        "prefix in belongs-to on line {}",
                        child.line
                    ))
                })?;
                let v = ctx.intern(arg_identifier(pfx_stmt)?);
                set_once(&mut prefix, v, "prefix", pfx_stmt.line)?;
            }
            Keyword::Organization => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut org, v, "organization", child.line)?;
            }
            Keyword::Contact => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut contact, v, "contact", child.line)?;
            }
            Keyword::Description => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut dsc, v, "description", child.line)?;
            }
            Keyword::Reference => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut reference, v, "reference", child.line)?;
            }
            Keyword::Revision => revisions.push(build_revision(ctx, child)?),
            Keyword::Import => {
                let import = build_import(ctx, child)?;
                let idx = {
                    let module = ctx.module_mut(mid);
                    module.imports.push(import);
                    module.imports.len() - 1
                };
                unres.push(mid, UnresItem::ModuleImport { import_idx: idx });
            }
            Keyword::Include => {
                let include = build_include(ctx, child)?;
                let idx = {
                    let module = ctx.module_mut(mid);
                    module.includes.push(include);
                    module.includes.len() - 1
                };
                unres.push(mid, UnresItem::ModuleInclude { include_idx: idx });
            }
            Keyword::Feature => build_feature(ctx, mid, child, unres)?,
            Keyword::Identity => build_identity(ctx, mid, child, unres)?,
            Keyword::Typedef => {
                let tpdf = build_typedef(ctx, mid, None, child, unres)?;
                ctx.module_mut(mid).typedefs.push(tpdf);
                let index = ctx.module(mid).typedefs.len() - 1;
                queue_typedef(ctx, mid, TypeOwner::TypedefModule { module: mid, index }, unres);
            }
            Keyword::Augment => {
                let aug = build_node(ctx, mid, None, child, unres)?;
                ctx.module_mut(mid).augments.push(aug);
                unres.push(mid, UnresItem::Augment { node: aug });
            }
            Keyword::Deviation => {
                let dev = build_deviation(ctx, child)?;
                let module = ctx.module_mut(mid);
                module.deviations.push(dev);
                let dev_idx = module.deviations.len() - 1;
                unres.push(mid, UnresItem::Deviation { dev_idx });
            }
            Keyword::Container
            | Keyword::Leaf
            | Keyword::LeafList
            | Keyword::List
            | Keyword::Choice
            | Keyword::Anyxml
            | Keyword::Uses
            | Keyword::Grouping
            | Keyword::Rpc
            | Keyword::Notification => {
                let id = build_node(ctx, mid, None, child, unres)?;
                link_top_level(ctx, mid, id);
            }
            Keyword::ExtensionDef => {
                debug!(
                    "ignoring extension definition {:?} in module {}",
                    child.arg_str(),
                    name
                );
            }
            Keyword::Extension { prefix, name: ext } => {
                handle_extension(ctx, prefix, ext, child.line, None)?;
            }
            other => {
                return Err(YangError::UnexpectedStatementInContext(format!(
                    "{other} inside {} on line {}",
                    stmt.keyword, child.line
                )))
            }
        }
    }

    if !submodule && ns.is_none() {
        return Err(YangError::MissingRequiredChild(format!(
            "namespace in module {name}"
        )));
    }
    if !submodule && prefix.is_none() {
        return Err(YangError::MissingRequiredChild(format!(
            "prefix in module {name}"
        )));
    }
    if submodule && !belongs_seen {
        return Err(YangError::MissingRequiredChild(format!(
            "belongs-to in submodule {name}"
        )));
    }

    // most recent revision first
    revisions.sort_by(|a, b| b.date.as_str().cmp(a.date.as_str()));

    let module = ctx.module_mut(mid);
    module.ns = ns;
    if let Some(p) = prefix {
        module.prefix = p;
    }
    module.version = version.unwrap_or_default();
    module.org = org;
    module.contact = contact;
    module.dsc = dsc;
    module.reference = reference;
    module.revisions = revisions;
    Ok(())
}

/// Append a finished top-level node to the owning main module's chain.
fn link_top_level(ctx: &mut Context, mid: ModuleId, id: NodeId) {
    let main = node::main_module(ctx, mid);
    let head = ctx.module(main).data;
    let head = ctx.nodes.append_to_chain(head, id);
    ctx.module_mut(main).data = Some(head);
}

fn build_revision(ctx: &mut Context, stmt: &Statement) -> YangResult<Revision> {
    let date = arg_required(stmt)?;
    check_revision_date(date, stmt.line)?;
    let mut rev = Revision {
        date: ctx.intern(date),
        dsc: None,
        reference: None,
    };
    for child in &stmt.children {
        match &child.keyword {
            Keyword::Description => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut rev.dsc, v, "description", child.line)?;
            }
            Keyword::Reference => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut rev.reference, v, "reference", child.line)?;
            }
            other => {
                return Err(YangError::UnexpectedStatementInContext(format!(
                    "{other} inside revision on line {}",
                    child.line
                )))
            }
        }
    }
    Ok(rev)
}

pub(crate) fn check_revision_date(date: &str, line: usize) -> YangResult<()> {
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| {
            YangError::InvalidValue(format!("revision date {date:?} on line {line}"))
        })
}

fn build_import(ctx: &mut Context, stmt: &Statement) -> YangResult<Import> {
    let name = ctx.intern(arg_identifier(stmt)?);
    let mut prefix = None;
    let mut revision = None;
    for child in &stmt.children {
        match &child.keyword {
            Keyword::Prefix => {
                let v = ctx.intern(arg_identifier(child)?);
                set_once(&mut prefix, v, "prefix", child.line)?;
            }
            Keyword::RevisionDate => {
                let date = arg_required(child)?;
                check_revision_date(date, child.line)?;
                let v = ctx.intern(date);
                set_once(&mut revision, v, "revision-date", child.line)?;
            }
            other => {
                return Err(YangError::UnexpectedStatementInContext(format!(
                    "{other} inside import on line {}",
                    child.line
                )))
            }
        }
    }
    let prefix = prefix.ok_or_else(|| {
        YangError::MissingRequiredChild(format!("prefix in import {name} on line {}", stmt.line))
    })?;
    Ok(Import {
        name,
        prefix,
        revision,
        module: None,
        external: crate::schema::ExternalKind::Local,
    })
}

fn build_include(ctx: &mut Context, stmt: &Statement) -> YangResult<Include> {
    let name = ctx.intern(arg_identifier(stmt)?);
    let mut revision = None;
    for child in &stmt.children {
        match &child.keyword {
            Keyword::RevisionDate => {
                let date = arg_required(child)?;
                check_revision_date(date, child.line)?;
                let v = ctx.intern(date);
                set_once(&mut revision, v, "revision-date", child.line)?;
            }
            other => {
                return Err(YangError::UnexpectedStatementInContext(format!(
                    "{other} inside include on line {}",
                    child.line
                )))
            }
        }
    }
    Ok(Include {
        name,
        revision,
        submodule: None,
    })
}

fn build_feature(
    ctx: &mut Context,
    mid: ModuleId,
    stmt: &Statement,
    unres: &mut Unres,
) -> YangResult<()> {
    let name = arg_identifier(stmt)?;
    if ctx.module(mid).find_feature(name).is_some() {
        return Err(YangError::DuplicateIdentifier(format!(
            "feature {name:?} in module {}",
            ctx.module(mid).name
        )));
    }
    let name = ctx.intern(name);
    let mut feature = Feature {
        name,
        dsc: None,
        reference: None,
        status: Status::Current,
        iffeatures: Vec::new(),
        enabled: false,
    };
    let mut iff_exprs = Vec::new();
    let mut status_seen = false;
    for child in &stmt.children {
        match &child.keyword {
            Keyword::IfFeature => iff_exprs.push(ctx.intern(arg_identifier_ref(child)?)),
            Keyword::Status => {
                if status_seen {
                    return Err(YangError::DuplicateStatement(format!(
                        "status on line {}",
                        child.line
                    )));
                }
                status_seen = true;
                feature.status = parse_status(child)?;
            }
            Keyword::Description => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut feature.dsc, v, "description", child.line)?;
            }
            Keyword::Reference => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut feature.reference, v, "reference", child.line)?;
            }
            other => {
                return Err(YangError::UnexpectedStatementInContext(format!(
                    "{other} inside feature on line {}",
                    child.line
                )))
            }
        }
    }
    let module = ctx.module_mut(mid);
    module.features.push(feature);
    let index = module.features.len() - 1;
    for expr in iff_exprs {
        unres.push(
            mid,
            UnresItem::Iffeat {
                target: IffTarget::Feature { module: mid, index },
                expr,
            },
        );
    }
    Ok(())
}

fn build_identity(
    ctx: &mut Context,
    mid: ModuleId,
    stmt: &Statement,
    unres: &mut Unres,
) -> YangResult<()> {
    let name = arg_identifier(stmt)?;
    if ctx.module(mid).find_identity(name).is_some() {
        return Err(YangError::DuplicateIdentifier(format!(
            "identity {name:?} in module {}",
            ctx.module(mid).name
        )));
    }
    let name = ctx.intern(name);
    let mut ident = Identity {
        name,
        dsc: None,
        reference: None,
        status: Status::Current,
        base_name: None,
        base: None,
    };
    let mut status_seen = false;
    for child in &stmt.children {
        match &child.keyword {
            Keyword::Base => {
                let v = ctx.intern(arg_identifier_ref(child)?);
                set_once(&mut ident.base_name, v, "base", child.line)?;
            }
            Keyword::Status => {
                if status_seen {
                    return Err(YangError::DuplicateStatement(format!(
                        "status on line {}",
                        child.line
                    )));
                }
                status_seen = true;
                ident.status = parse_status(child)?;
            }
            Keyword::Description => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut ident.dsc, v, "description", child.line)?;
            }
            Keyword::Reference => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut ident.reference, v, "reference", child.line)?;
            }
            other => {
                return Err(YangError::UnexpectedStatementInContext(format!(
                    "{other} inside identity on line {}",
                    child.line
                )))
            }
        }
    }
    let has_base = ident.base_name.is_some();
    let module = ctx.module_mut(mid);
    module.identities.push(ident);
    let ident_idx = module.identities.len() - 1;
    if has_base {
        unres.push(mid, UnresItem::IdentityBase { ident_idx });
    }
    Ok(())
}

fn build_typedef(
    ctx: &mut Context,
    mid: ModuleId,
    parent: Option<NodeId>,
    stmt: &Statement,
    _unres: &mut Unres,
) -> YangResult<Typedef> {
    let name = arg_identifier(stmt)?;
    check_typedef_name(ctx, mid, parent, name)?;
    let name = ctx.intern(name);

    let mut typ = None;
    let mut tpdf = Typedef {
        name: name.clone(),
        typ: YangType::placeholder(),
        units: None,
        default: None,
        dsc: None,
        reference: None,
        status: Status::Current,
    };
    let mut status_seen = false;
    for child in &stmt.children {
        match &child.keyword {
            Keyword::Type => {
                let t = build_type(ctx, child)?;
                set_once(&mut typ, t, "type", child.line)?;
            }
            Keyword::Units => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut tpdf.units, v, "units", child.line)?;
            }
            Keyword::Default => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut tpdf.default, v, "default", child.line)?;
            }
            Keyword::Status => {
                if status_seen {
                    return Err(YangError::DuplicateStatement(format!(
                        "status on line {}",
                        child.line
                    )));
                }
                status_seen = true;
                tpdf.status = parse_status(child)?;
            }
            Keyword::Description => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut tpdf.dsc, v, "description", child.line)?;
            }
            Keyword::Reference => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut tpdf.reference, v, "reference", child.line)?;
            }
            other => {
                return Err(YangError::UnexpectedStatementInContext(format!(
                    "{other} inside typedef on line {}",
                    child.line
                )))
            }
        }
    }
    tpdf.typ = typ.ok_or_else(|| {
        YangError::MissingRequiredChild(format!("type in typedef {name} on line {}", stmt.line))
    })?;
    Ok(tpdf)
}

/// Queue resolution (and default checking) for a typedef just pushed.
fn queue_typedef(ctx: &Context, mid: ModuleId, owner: TypeOwner, unres: &mut Unres) {
    let has_default = match &owner {
        TypeOwner::TypedefModule { module, index } => {
            ctx.module(*module).typedefs[*index].default.is_some()
        }
        TypeOwner::TypedefNode { node, index } => {
            ctx.nodes[*node].typedefs()[*index].default.is_some()
        }
        TypeOwner::Leaf(_) => false,
    };
    unres.push(mid, UnresItem::TypeDerTypedef { owner: owner.clone() });
    if has_default {
        unres.push(mid, UnresItem::TypeDefault { owner });
    }
}

pub(crate) fn build_type(ctx: &mut Context, stmt: &Statement) -> YangResult<YangType> {
    let full = arg_required(stmt)?;
    let (prefix, local) = match full.split_once(':') {
        Some((p, l)) => (Some(ctx.intern(p)), l),
        None => (None, full),
    };
    let name = ctx.intern(local);

    let mut spec = RawTypeSpec::default();
    let mut last_enum_value: Option<i32> = None;
    let mut last_bit_pos: Option<u32> = None;
    for child in &stmt.children {
        match &child.keyword {
            Keyword::Range => {
                let r = build_restr(ctx, child)?;
                set_once(&mut spec.range, r, "range", child.line)?;
            }
            Keyword::Length => {
                let r = build_restr(ctx, child)?;
                set_once(&mut spec.length, r, "length", child.line)?;
            }
            Keyword::Pattern => spec.patterns.push(build_pattern(ctx, child)?),
            Keyword::FractionDigits => {
                let digits: u8 = child.arg_str().parse().map_err(|_| {
                    YangError::InvalidValue(format!(
                        "fraction-digits {:?} on line {}",
                        child.arg_str(),
                        child.line
                    ))
                })?;
                if !(1..=18).contains(&digits) {
                    return Err(YangError::InvalidValue(format!(
                        "fraction-digits {digits} outside [1,18] on line {}",
                        child.line
                    )));
                }
                set_once(&mut spec.fraction_digits, digits, "fraction-digits", child.line)?;
            }
            Keyword::Enum => {
                let e = build_enum(ctx, child, &spec.enums, &mut last_enum_value)?;
                spec.enums.push(e);
            }
            Keyword::Bit => {
                let b = build_bit(ctx, child, &spec.bits, &mut last_bit_pos)?;
                spec.bits.push(b);
            }
            Keyword::Path => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut spec.path, v, "path", child.line)?;
            }
            Keyword::RequireInstance => {
                let v = parse_bool(child)?;
                set_once(&mut spec.require_instance, v, "require-instance", child.line)?;
            }
            Keyword::Base => {
                let v = ctx.intern(arg_identifier_ref(child)?);
                set_once(&mut spec.ident_base, v, "base", child.line)?;
            }
            Keyword::Type => spec.union_types.push(build_type(ctx, child)?),
            other => {
                return Err(YangError::UnexpectedStatementInContext(format!(
                    "{other} inside type on line {}",
                    child.line
                )))
            }
        }
    }

    // bit order is by position, whatever the source order was
    spec.bits.sort_by_key(|b| b.pos);

    Ok(YangType::new(name, prefix, spec))
}

fn build_enum(
    ctx: &mut Context,
    stmt: &Statement,
    previous: &[EnumValue],
    last_value: &mut Option<i32>,
) -> YangResult<EnumValue> {
    let name = arg_required(stmt)?;
    if name.trim() != name || name.is_empty() {
        return Err(YangError::InvalidValue(format!(
            "enum name {name:?} on line {}",
            stmt.line
        )));
    }
    if previous.iter().any(|e| e.name == name) {
        return Err(YangError::DuplicateIdentifier(format!(
            "enum {name:?} on line {}",
            stmt.line
        )));
    }
    let name = ctx.intern(name);
    let mut value: Option<i32> = None;
    let mut ev = EnumValue {
        name,
        dsc: None,
        reference: None,
        value: 0,
        auto: true,
    };
    for child in &stmt.children {
        match &child.keyword {
            Keyword::Value => {
                let v: i64 = child.arg_str().parse().map_err(|_| {
                    YangError::InvalidValue(format!(
                        "enum value {:?} on line {}",
                        child.arg_str(),
                        child.line
                    ))
                })?;
                if v < i32::MIN as i64 || v > i32::MAX as i64 {
                    return Err(YangError::EnumValueOverflow(format!(
                        "enum value {v} on line {}",
                        child.line
                    )));
                }
                set_once(&mut value, v as i32, "value", child.line)?;
            }
            Keyword::Status => {
                parse_status(child)?;
            }
            Keyword::Description => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut ev.dsc, v, "description", child.line)?;
            }
            Keyword::Reference => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut ev.reference, v, "reference", child.line)?;
            }
            other => {
                return Err(YangError::UnexpectedStatementInContext(format!(
                    "{other} inside enum on line {}",
                    child.line
                )))
            }
        }
    }
    match value {
        Some(v) => {
            ev.value = v;
            ev.auto = false;
        }
        None => {
            let next = match *last_value {
                Some(prev) => prev.checked_add(1).ok_or_else(|| {
                    YangError::EnumValueOverflow(format!(
                        "auto-assigned value for enum {} on line {}",
                        ev.name, stmt.line
                    ))
                })?,
                None => 0,
            };
            ev.value = next;
        }
    }
    if previous.iter().any(|e| e.value == ev.value) {
        return Err(YangError::InvalidValue(format!(
            "enum value {} reused on line {}",
            ev.value, stmt.line
        )));
    }
    *last_value = Some(ev.value);
    Ok(ev)
}

fn build_bit(
    ctx: &mut Context,
    stmt: &Statement,
    previous: &[Bit],
    last_pos: &mut Option<u32>,
) -> YangResult<Bit> {
    let name = arg_identifier(stmt)?;
    if previous.iter().any(|b| b.name == name) {
        return Err(YangError::DuplicateIdentifier(format!(
            "bit {name:?} on line {}",
            stmt.line
        )));
    }
    let name = ctx.intern(name);
    let mut pos: Option<u32> = None;
    let mut bit = Bit {
        name,
        dsc: None,
        reference: None,
        pos: 0,
        auto: true,
    };
    for child in &stmt.children {
        match &child.keyword {
            Keyword::Position => {
                let v: u64 = child.arg_str().parse().map_err(|_| {
                    YangError::InvalidValue(format!(
                        "bit position {:?} on line {}",
                        child.arg_str(),
                        child.line
                    ))
                })?;
                if v > u32::MAX as u64 {
                    return Err(YangError::BitPositionOverflow(format!(
                        "bit position {v} on line {}",
                        child.line
                    )));
                }
                set_once(&mut pos, v as u32, "position", child.line)?;
            }
            Keyword::Status => {
                parse_status(child)?;
            }
            Keyword::Description => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut bit.dsc, v, "description", child.line)?;
            }
            Keyword::Reference => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut bit.reference, v, "reference", child.line)?;
            }
            other => {
                return Err(YangError::UnexpectedStatementInContext(format!(
                    "{other} inside bit on line {}",
                    child.line
                )))
            }
        }
    }
    match pos {
        Some(p) => {
            bit.pos = p;
            bit.auto = false;
        }
        None => {
            let next = match *last_pos {
                Some(prev) => prev.checked_add(1).ok_or_else(|| {
                    YangError::BitPositionOverflow(format!(
                        "auto-assigned position for bit {} on line {}",
                        bit.name, stmt.line
                    ))
                })?,
                None => 0,
            };
            bit.pos = next;
        }
    }
    if previous.iter().any(|b| b.pos == bit.pos) {
        return Err(YangError::InvalidValue(format!(
            "bit position {} reused on line {}",
            bit.pos, stmt.line
        )));
    }
    *last_pos = Some(bit.pos);
    Ok(bit)
}

fn build_restr(ctx: &mut Context, stmt: &Statement) -> YangResult<Restr> {
    let mut restr = Restr {
        expr: ctx.intern(arg_required(stmt)?),
        dsc: None,
        reference: None,
        emsg: None,
        eapptag: None,
    };
    restr_children(
        ctx,
        stmt,
        &mut restr.dsc,
        &mut restr.reference,
        &mut restr.emsg,
        &mut restr.eapptag,
    )?;
    Ok(restr)
}

fn build_pattern(ctx: &mut Context, stmt: &Statement) -> YangResult<Pattern> {
    let mut pat = Pattern {
        expr: ctx.intern(arg_required(stmt)?),
        dsc: None,
        reference: None,
        emsg: None,
        eapptag: None,
    };
    restr_children(
        ctx,
        stmt,
        &mut pat.dsc,
        &mut pat.reference,
        &mut pat.emsg,
        &mut pat.eapptag,
    )?;
    Ok(pat)
}

fn restr_children(
    ctx: &mut Context,
    stmt: &Statement,
    dsc: &mut Option<Sym>,
    reference: &mut Option<Sym>,
    emsg: &mut Option<Sym>,
    eapptag: &mut Option<Sym>,
) -> YangResult<()> {
    for child in &stmt.children {
        match &child.keyword {
            Keyword::ErrorMessage => {
                let v = ctx.intern(arg_required(child)?);
                set_once(emsg, v, "error-message", child.line)?;
            }
            Keyword::ErrorAppTag => {
                let v = ctx.intern(arg_required(child)?);
                set_once(eapptag, v, "error-app-tag", child.line)?;
            }
            Keyword::Description => {
                let v = ctx.intern(arg_required(child)?);
                set_once(dsc, v, "description", child.line)?;
            }
            Keyword::Reference => {
                let v = ctx.intern(arg_required(child)?);
                set_once(reference, v, "reference", child.line)?;
            }
            other => {
                return Err(YangError::UnexpectedStatementInContext(format!(
                    "{other} inside {} on line {}",
                    stmt.keyword, child.line
                )))
            }
        }
    }
    Ok(())
}

pub(crate) fn build_must(ctx: &mut Context, stmt: &Statement) -> YangResult<Must> {
    let mut must = Must {
        expr: ctx.intern(arg_required(stmt)?),
        dsc: None,
        reference: None,
        emsg: None,
        eapptag: None,
    };
    restr_children(
        ctx,
        stmt,
        &mut must.dsc,
        &mut must.reference,
        &mut must.emsg,
        &mut must.eapptag,
    )?;
    Ok(must)
}

fn build_when(ctx: &mut Context, stmt: &Statement) -> YangResult<When> {
    let mut when = When {
        cond: ctx.intern(arg_required(stmt)?),
        dsc: None,
        reference: None,
    };
    for child in &stmt.children {
        match &child.keyword {
            Keyword::Description => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut when.dsc, v, "description", child.line)?;
            }
            Keyword::Reference => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut when.reference, v, "reference", child.line)?;
            }
            other => {
                return Err(YangError::UnexpectedStatementInContext(format!(
                    "{other} inside when on line {}",
                    child.line
                )))
            }
        }
    }
    Ok(when)
}

fn build_refine(ctx: &mut Context, stmt: &Statement) -> YangResult<Refine> {
    let mut refine = Refine {
        target_path: ctx.intern(arg_required(stmt)?),
        dsc: None,
        reference: None,
        presence: None,
        default: None,
        config: None,
        mandatory: None,
        min: None,
        max: None,
        musts: Vec::new(),
    };
    for child in &stmt.children {
        match &child.keyword {
            Keyword::Description => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut refine.dsc, v, "description", child.line)?;
            }
            Keyword::Reference => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut refine.reference, v, "reference", child.line)?;
            }
            Keyword::Presence => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut refine.presence, v, "presence", child.line)?;
            }
            Keyword::Default => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut refine.default, v, "default", child.line)?;
            }
            Keyword::Config => {
                let v = parse_bool(child)?;
                set_once(&mut refine.config, v, "config", child.line)?;
            }
            Keyword::Mandatory => {
                let v = parse_bool(child)?;
                set_once(&mut refine.mandatory, v, "mandatory", child.line)?;
            }
            Keyword::MinElements => {
                let v = parse_min_elements(child)?;
                set_once(&mut refine.min, v, "min-elements", child.line)?;
            }
            Keyword::MaxElements => {
                let v = parse_max_elements(child)?;
                set_once(&mut refine.max, v, "max-elements", child.line)?;
            }
            Keyword::Must => refine.musts.push(build_must(ctx, child)?),
            other => {
                return Err(YangError::UnexpectedStatementInContext(format!(
                    "{other} inside refine on line {}",
                    child.line
                )))
            }
        }
    }
    Ok(refine)
}

fn build_deviation(ctx: &mut Context, stmt: &Statement) -> YangResult<Deviation> {
    let mut dev = Deviation {
        target_path: ctx.intern(arg_required(stmt)?),
        target: None,
        dsc: None,
        reference: None,
        deviates: Vec::new(),
        orig: None,
        applied: false,
    };
    for child in &stmt.children {
        match &child.keyword {
            Keyword::Description => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut dev.dsc, v, "description", child.line)?;
            }
            Keyword::Reference => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut dev.reference, v, "reference", child.line)?;
            }
            Keyword::Deviate => dev.deviates.push(build_deviate(ctx, child)?),
            other => {
                return Err(YangError::UnexpectedStatementInContext(format!(
                    "{other} inside deviation on line {}",
                    child.line
                )))
            }
        }
    }
    if dev.deviates.is_empty() {
        return Err(YangError::MissingRequiredChild(format!(
            "deviate in deviation {} on line {}",
            dev.target_path, stmt.line
        )));
    }
    let has_not_supported = dev
        .deviates
        .iter()
        .any(|d| d.kind == DeviateKind::NotSupported);
    if has_not_supported && dev.deviates.len() > 1 {
        return Err(YangError::UnexpectedStatementInContext(format!(
            "deviate not-supported combined with other deviates on line {}",
            stmt.line
        )));
    }
    Ok(dev)
}

fn build_deviate(ctx: &mut Context, stmt: &Statement) -> YangResult<Deviate> {
    let kind = match arg_required(stmt)? {
        "not-supported" => DeviateKind::NotSupported,
        "add" => DeviateKind::Add,
        "replace" => DeviateKind::Replace,
        "delete" => DeviateKind::Delete,
        other => {
            return Err(YangError::InvalidValue(format!(
                "deviate {other:?} on line {}",
                stmt.line
            )))
        }
    };
    let mut dv = Deviate {
        kind,
        units: None,
        musts: Vec::new(),
        uniques: Vec::new(),
        default: None,
        config: None,
        mandatory: None,
        min: None,
        max: None,
        typ: None,
    };
    if kind == DeviateKind::NotSupported {
        if let Some(child) = stmt.children.first() {
            return Err(YangError::UnexpectedStatementInContext(format!(
                "{} inside deviate not-supported on line {}",
                child.keyword, child.line
            )));
        }
        return Ok(dv);
    }
    for child in &stmt.children {
        match &child.keyword {
            Keyword::Units => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut dv.units, v, "units", child.line)?;
            }
            Keyword::Must => dv.musts.push(build_must(ctx, child)?),
            Keyword::Unique => dv.uniques.push(ctx.intern(arg_required(child)?)),
            Keyword::Default => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut dv.default, v, "default", child.line)?;
            }
            Keyword::Config => {
                let v = parse_bool(child)?;
                set_once(&mut dv.config, v, "config", child.line)?;
            }
            Keyword::Mandatory => {
                let v = parse_bool(child)?;
                set_once(&mut dv.mandatory, v, "mandatory", child.line)?;
            }
            Keyword::MinElements => {
                let v = parse_min_elements(child)?;
                set_once(&mut dv.min, v, "min-elements", child.line)?;
            }
            Keyword::MaxElements => {
                let v = parse_max_elements(child)?;
                set_once(&mut dv.max, v, "max-elements", child.line)?;
            }
            Keyword::Type => {
                let t = build_type(ctx, child)?;
                set_once(&mut dv.typ, t, "type", child.line)?;
            }
            other => {
                return Err(YangError::UnexpectedStatementInContext(format!(
                    "{other} inside deviate {} on line {}",
                    kind.as_str(),
                    child.line
                )))
            }
        }
    }
    Ok(dv)
}

/// Build one schema node (and its subtree). `parent` is `None` for
/// top-level nodes and module-level augments.
pub(crate) fn build_node(
    ctx: &mut Context,
    mid: ModuleId,
    parent: Option<NodeId>,
    stmt: &Statement,
    unres: &mut Unres,
) -> YangResult<NodeId> {
    let kind = match &stmt.keyword {
        Keyword::Container => NodeKind::Container(ContainerBody::default()),
        Keyword::List => NodeKind::List(ListBody::default()),
        Keyword::Leaf => NodeKind::Leaf(LeafBody {
            typ: YangType::placeholder(),
            units: None,
            default: None,
            musts: Vec::new(),
            when: None,
            backlinks: Vec::new(),
        }),
        Keyword::LeafList => NodeKind::LeafList(LeafListBody {
            typ: YangType::placeholder(),
            units: None,
            musts: Vec::new(),
            when: None,
            backlinks: Vec::new(),
            min: 0,
            max: 0,
            min_set: false,
            max_set: false,
            ordered_by_user: false,
        }),
        Keyword::Choice => NodeKind::Choice(ChoiceBody::default()),
        Keyword::Case => NodeKind::Case(CaseBody::default()),
        Keyword::Anyxml => NodeKind::AnyXml(AnyXmlBody::default()),
        Keyword::Uses => NodeKind::Uses(UsesBody {
            grouping_name: Sym::detached(""),
            grouping: None,
            refines: Vec::new(),
            augments: Vec::new(),
            when: None,
        }),
        Keyword::Grouping => NodeKind::Grouping(GroupingBody::default()),
        Keyword::Augment => NodeKind::Augment(AugmentBody {
            target_path: Sym::detached(""),
            target: None,
            when: None,
            spliced: Vec::new(),
        }),
        Keyword::Rpc => NodeKind::Rpc(RpcBody::default()),
        Keyword::Input => NodeKind::Input(InOutBody::default()),
        Keyword::Output => NodeKind::Output(InOutBody::default()),
        Keyword::Notification => NodeKind::Notification(NotifBody::default()),
        other => {
            return Err(YangError::UnexpectedStatementInContext(format!(
                "{other} on line {} is not a schema node",
                stmt.line
            )))
        }
    };

    // uses and augment take a reference argument, input/output take none
    let name = match &kind {
        NodeKind::Uses(_) | NodeKind::Augment(_) => {
            ctx.intern(arg_required(stmt)?)
        }
        NodeKind::Input(_) => ctx.intern("input"),
        NodeKind::Output(_) => ctx.intern("output"),
        _ => ctx.intern(arg_identifier(stmt)?),
    };

    match &kind {
        NodeKind::Grouping(_) => check_grouping_name(ctx, mid, parent, &name)?,
        NodeKind::Augment(_) => {}
        NodeKind::Uses(_) | NodeKind::Input(_) | NodeKind::Output(_) => {}
        _ => {
            let first = node::level_chain(ctx, parent, mid);
            node::check_name_free(ctx, first, mid, &name, None)?;
        }
    }

    let mut node = SchemaNode::new(name.clone(), mid, kind);
    if let NodeKind::Uses(u) = &mut node.kind {
        u.grouping_name = name.clone();
    }
    if let NodeKind::Augment(a) = &mut node.kind {
        a.target_path = name.clone();
    }

    // effective config flows down; rpc, input/output and notification
    // subtrees carry no config and read as false
    node.config = match parent {
        Some(p) => ctx.nodes[p].config,
        None => true,
    };
    if matches!(
        node.kind,
        NodeKind::Rpc(_) | NodeKind::Input(_) | NodeKind::Output(_) | NodeKind::Notification(_)
    ) {
        node.config = false;
    }

    let id = ctx.nodes.alloc(node);
    if let Some(p) = parent {
        let head = ctx.nodes[p].child;
        let head = ctx.nodes.append_to_chain(head, id);
        ctx.nodes[id].parent = Some(p);
        ctx.nodes[p].child = Some(head);
    }

    let result = build_node_body(ctx, mid, id, stmt, unres);
    if let Err(e) = result {
        return Err(e);
    }
    Ok(id)
}

/// Fill a freshly allocated node from its substatements.
fn build_node_body(
    ctx: &mut Context,
    mid: ModuleId,
    id: NodeId,
    stmt: &Statement,
    unres: &mut Unres,
) -> YangResult<()> {
    let mut status_seen = false;
    let mut ordered_seen = false;
    let mut key_expr: Option<Sym> = None;
    let mut choice_default: Option<Sym> = None;
    let mut input_seen = false;
    let mut output_seen = false;
    let mut typedef_count = 0usize;

    for child in &stmt.children {
        let allowed = statement_allowed(&ctx.nodes[id].kind, &child.keyword);
        if !allowed {
            if let Keyword::Extension { prefix, name } = &child.keyword {
                handle_extension(ctx, prefix, name, child.line, Some(id))?;
                continue;
            }
            return Err(YangError::UnexpectedStatementInContext(format!(
                "{} inside {} on line {}",
                child.keyword,
                ctx.nodes[id].kind.keyword(),
                child.line
            )));
        }
        match &child.keyword {
            Keyword::Description => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut ctx.nodes[id].dsc, v, "description", child.line)?;
            }
            Keyword::Reference => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut ctx.nodes[id].reference, v, "reference", child.line)?;
            }
            Keyword::Status => {
                if status_seen {
                    return Err(YangError::DuplicateStatement(format!(
                        "status on line {}",
                        child.line
                    )));
                }
                status_seen = true;
                let s = parse_status(child)?;
                ctx.nodes[id].status = s;
            }
            Keyword::Config => {
                if ctx.nodes[id].config_set {
                    return Err(YangError::DuplicateStatement(format!(
                        "config on line {}",
                        child.line
                    )));
                }
                let explicit = parse_bool(child)?;
                let parent_cfg = match ctx.nodes[id].parent {
                    Some(p) => ctx.nodes[p].config,
                    None => true,
                };
                if explicit && !parent_cfg && !node::in_grouping(ctx, id) {
                    return Err(YangError::InvalidValue(format!(
                        "config true under a config false parent at {}",
                        node::schema_path(ctx, id)
                    )));
                }
                let n = &mut ctx.nodes[id];
                n.config = explicit;
                n.config_set = true;
            }
            Keyword::Mandatory => {
                if ctx.nodes[id].mandatory_set {
                    return Err(YangError::DuplicateStatement(format!(
                        "mandatory on line {}",
                        child.line
                    )));
                }
                let v = parse_bool(child)?;
                let n = &mut ctx.nodes[id];
                n.mandatory = v;
                n.mandatory_set = true;
            }
            Keyword::IfFeature => {
                let expr = ctx.intern(arg_identifier_ref(child)?);
                unres.push(
                    mid,
                    UnresItem::Iffeat {
                        target: IffTarget::Node(id),
                        expr,
                    },
                );
            }
            Keyword::When => {
                let w = build_when(ctx, child)?;
                let slot = when_slot(&mut ctx.nodes[id].kind).ok_or_else(|| {
                    YangError::Internal("when on a node without a when slot".to_string())
                })?;
                set_once(slot, w, "when", child.line)?;
            }
            Keyword::Must => {
                let m = build_must(ctx, child)?;
                match &mut ctx.nodes[id].kind {
                    NodeKind::Container(b) => b.musts.push(m),
                    NodeKind::List(b) => b.musts.push(m),
                    NodeKind::Leaf(b) => b.musts.push(m),
                    NodeKind::LeafList(b) => b.musts.push(m),
                    NodeKind::AnyXml(b) => b.musts.push(m),
                    _ => {
                        return Err(YangError::Internal(
                            "must on a node without a must slot".to_string(),
                        ))
                    }
                }
            }
            Keyword::Presence => {
                let v = ctx.intern(arg_required(child)?);
                match &mut ctx.nodes[id].kind {
                    NodeKind::Container(b) => set_once(&mut b.presence, v, "presence", child.line)?,
                    _ => {
                        return Err(YangError::Internal(
                            "presence outside a container".to_string(),
                        ))
                    }
                }
            }
            Keyword::Type => {
                let t = build_type(ctx, child)?;
                match &mut ctx.nodes[id].kind {
                    NodeKind::Leaf(b) => {
                        if b.typ.is_resolved() || !b.typ.name.is_empty() {
                            return Err(YangError::DuplicateStatement(format!(
                                "type on line {}",
                                child.line
                            )));
                        }
                        b.typ = t;
                    }
                    NodeKind::LeafList(b) => {
                        if b.typ.is_resolved() || !b.typ.name.is_empty() {
                            return Err(YangError::DuplicateStatement(format!(
                                "type on line {}",
                                child.line
                            )));
                        }
                        b.typ = t;
                    }
                    _ => {
                        return Err(YangError::Internal(
                            "type on a node without a type".to_string(),
                        ))
                    }
                }
            }
            Keyword::Units => {
                let v = ctx.intern(arg_required(child)?);
                match &mut ctx.nodes[id].kind {
                    NodeKind::Leaf(b) => set_once(&mut b.units, v, "units", child.line)?,
                    NodeKind::LeafList(b) => set_once(&mut b.units, v, "units", child.line)?,
                    _ => return Err(YangError::Internal("units misplaced".to_string())),
                }
            }
            Keyword::Default => {
                let v = ctx.intern(arg_required(child)?);
                match &mut ctx.nodes[id].kind {
                    NodeKind::Leaf(b) => set_once(&mut b.default, v, "default", child.line)?,
                    NodeKind::Choice(_) => {
                        set_once(&mut choice_default, v, "default", child.line)?
                    }
                    _ => return Err(YangError::Internal("default misplaced".to_string())),
                }
            }
            Keyword::Key => {
                let v = ctx.intern(arg_required(child)?);
                set_once(&mut key_expr, v, "key", child.line)?;
            }
            Keyword::Unique => {
                let v = ctx.intern(arg_required(child)?);
                match &mut ctx.nodes[id].kind {
                    NodeKind::List(b) => {
                        b.uniques_raw.push(v.clone());
                        b.uniques.push(Vec::new());
                        let slot = b.uniques.len() - 1;
                        unres.push(mid, UnresItem::ListUnique { node: id, expr: v, slot });
                    }
                    _ => return Err(YangError::Internal("unique misplaced".to_string())),
                }
            }
            Keyword::MinElements => {
                let v = parse_min_elements(child)?;
                let (min, min_set) = match &mut ctx.nodes[id].kind {
                    NodeKind::List(b) => (&mut b.min, &mut b.min_set),
                    NodeKind::LeafList(b) => (&mut b.min, &mut b.min_set),
                    _ => return Err(YangError::Internal("min-elements misplaced".to_string())),
                };
                if *min_set {
                    return Err(YangError::DuplicateStatement(format!(
                        "min-elements on line {}",
                        child.line
                    )));
                }
                *min = v;
                *min_set = true;
            }
            Keyword::MaxElements => {
                let v = parse_max_elements(child)?;
                let (max, max_set) = match &mut ctx.nodes[id].kind {
                    NodeKind::List(b) => (&mut b.max, &mut b.max_set),
                    NodeKind::LeafList(b) => (&mut b.max, &mut b.max_set),
                    _ => return Err(YangError::Internal("max-elements misplaced".to_string())),
                };
                if *max_set {
                    return Err(YangError::DuplicateStatement(format!(
                        "max-elements on line {}",
                        child.line
                    )));
                }
                *max = v;
                *max_set = true;
            }
            Keyword::OrderedBy => {
                if ordered_seen {
                    return Err(YangError::DuplicateStatement(format!(
                        "ordered-by on line {}",
                        child.line
                    )));
                }
                ordered_seen = true;
                let user = match child.arg_str() {
                    "user" => true,
                    "system" => false,
                    other => {
                        return Err(YangError::InvalidValue(format!(
                            "ordered-by {other:?} on line {}",
                            child.line
                        )))
                    }
                };
                match &mut ctx.nodes[id].kind {
                    NodeKind::List(b) => b.ordered_by_user = user,
                    NodeKind::LeafList(b) => b.ordered_by_user = user,
                    _ => return Err(YangError::Internal("ordered-by misplaced".to_string())),
                }
            }
            Keyword::Typedef => {
                let tpdf = build_typedef(ctx, mid, Some(id), child, unres)?;
                let index = typedef_count;
                typedef_count += 1;
                push_typedef(ctx, id, tpdf)?;
                queue_typedef(ctx, mid, TypeOwner::TypedefNode { node: id, index }, unres);
            }
            Keyword::Refine => {
                let r = build_refine(ctx, child)?;
                match &mut ctx.nodes[id].kind {
                    NodeKind::Uses(b) => b.refines.push(r),
                    _ => return Err(YangError::Internal("refine misplaced".to_string())),
                }
            }
            Keyword::Augment if matches!(ctx.nodes[id].kind, NodeKind::Uses(_)) => {
                // relative augment, applied during grouping expansion
                let aug = build_node(ctx, mid, None, child, unres)?;
                match &mut ctx.nodes[id].kind {
                    NodeKind::Uses(b) => b.augments.push(aug),
                    _ => return Err(YangError::Internal("uses body changed".to_string())),
                }
            }
            Keyword::Input => {
                if input_seen {
                    return Err(YangError::DuplicateStatement(format!(
                        "input on line {}",
                        child.line
                    )));
                }
                input_seen = true;
                build_node(ctx, mid, Some(id), child, unres)?;
            }
            Keyword::Output => {
                if output_seen {
                    return Err(YangError::DuplicateStatement(format!(
                        "output on line {}",
                        child.line
                    )));
                }
                output_seen = true;
                build_node(ctx, mid, Some(id), child, unres)?;
            }
            Keyword::Container
            | Keyword::Leaf
            | Keyword::LeafList
            | Keyword::List
            | Keyword::Choice
            | Keyword::Case
            | Keyword::Anyxml
            | Keyword::Uses
            | Keyword::Grouping => {
                build_node(ctx, mid, Some(id), child, unres)?;
            }
            Keyword::Extension { prefix, name } => {
                handle_extension(ctx, prefix, name, child.line, Some(id))?;
            }
            other => {
                return Err(YangError::UnexpectedStatementInContext(format!(
                    "{other} inside {} on line {}",
                    ctx.nodes[id].kind.keyword(),
                    child.line
                )))
            }
        }
    }

    finish_node(ctx, mid, id, stmt, key_expr, choice_default, unres)
}

/// Per-node closing checks and queueing once all substatements are in.
fn finish_node(
    ctx: &mut Context,
    mid: ModuleId,
    id: NodeId,
    stmt: &Statement,
    key_expr: Option<Sym>,
    choice_default: Option<Sym>,
    unres: &mut Unres,
) -> YangResult<()> {
    match &ctx.nodes[id].kind {
        NodeKind::Leaf(b) => {
            if b.typ.name.is_empty() {
                return Err(YangError::MissingRequiredChild(format!(
                    "type in leaf {} on line {}",
                    ctx.nodes[id].name, stmt.line
                )));
            }
            if ctx.nodes[id].mandatory && b.default.is_some() {
                return Err(YangError::MandatoryWithDefault(format!(
                    "leaf {} on line {}",
                    ctx.nodes[id].name, stmt.line
                )));
            }
            let has_default = b.default.is_some();
            unres.push(mid, UnresItem::TypeDer { owner: TypeOwner::Leaf(id) });
            if has_default {
                unres.push(mid, UnresItem::TypeDefault { owner: TypeOwner::Leaf(id) });
            }
        }
        NodeKind::LeafList(b) => {
            if b.typ.name.is_empty() {
                return Err(YangError::MissingRequiredChild(format!(
                    "type in leaf-list {} on line {}",
                    ctx.nodes[id].name, stmt.line
                )));
            }
            if b.min_set && b.max_set && b.max != 0 && b.min > b.max {
                return Err(YangError::InvalidRange(format!(
                    "min-elements {} > max-elements {} on line {}",
                    b.min, b.max, stmt.line
                )));
            }
            unres.push(mid, UnresItem::TypeDer { owner: TypeOwner::Leaf(id) });
        }
        NodeKind::List(b) => {
            if b.min_set && b.max_set && b.max != 0 && b.min > b.max {
                return Err(YangError::InvalidRange(format!(
                    "min-elements {} > max-elements {} on line {}",
                    b.min, b.max, stmt.line
                )));
            }
            match key_expr {
                Some(expr) => unres.push(mid, UnresItem::ListKeys { node: id, expr }),
                None => {
                    if ctx.nodes[id].config && !node::in_grouping(ctx, id) {
                        return Err(YangError::MissingRequiredChild(format!(
                            "key in config list {} on line {}",
                            ctx.nodes[id].name, stmt.line
                        )));
                    }
                }
            }
        }
        NodeKind::Choice(_) => {
            if let Some(name) = choice_default {
                if ctx.nodes[id].mandatory {
                    return Err(YangError::MandatoryWithDefault(format!(
                        "choice {} on line {}",
                        ctx.nodes[id].name, stmt.line
                    )));
                }
                unres.push(mid, UnresItem::ChoiceDefault { node: id, name });
            }
        }
        NodeKind::Uses(_) => {
            unres.push(mid, UnresItem::Uses { node: id });
        }
        _ => {}
    }
    Ok(())
}

fn push_typedef(ctx: &mut Context, id: NodeId, tpdf: Typedef) -> YangResult<()> {
    match &mut ctx.nodes[id].kind {
        NodeKind::Container(b) => b.typedefs.push(tpdf),
        NodeKind::List(b) => b.typedefs.push(tpdf),
        NodeKind::Grouping(b) => b.typedefs.push(tpdf),
        NodeKind::Rpc(b) => b.typedefs.push(tpdf),
        NodeKind::Input(b) => b.typedefs.push(tpdf),
        NodeKind::Output(b) => b.typedefs.push(tpdf),
        NodeKind::Notification(b) => b.typedefs.push(tpdf),
        _ => {
            return Err(YangError::Internal(
                "typedef on a node without a typedef slot".to_string(),
            ))
        }
    }
    Ok(())
}

fn when_slot(kind: &mut NodeKind) -> Option<&mut Option<When>> {
    Some(match kind {
        NodeKind::Container(b) => &mut b.when,
        NodeKind::List(b) => &mut b.when,
        NodeKind::Leaf(b) => &mut b.when,
        NodeKind::LeafList(b) => &mut b.when,
        NodeKind::Choice(b) => &mut b.when,
        NodeKind::Case(b) => &mut b.when,
        NodeKind::AnyXml(b) => &mut b.when,
        NodeKind::Uses(b) => &mut b.when,
        NodeKind::Augment(b) => &mut b.when,
        _ => return None,
    })
}

/// NACM extension statements set node flags; anything else is skipped
/// (or rejected, when the repository is configured strictly).
fn handle_extension(
    ctx: &mut Context,
    prefix: &str,
    name: &str,
    line: usize,
    node: Option<NodeId>,
) -> YangResult<()> {
    match (name, node) {
        ("default-deny-write", Some(id)) => {
            ctx.nodes[id].nacm |= NACM_DENY_WRITE;
            Ok(())
        }
        ("default-deny-all", Some(id)) => {
            ctx.nodes[id].nacm |= NACM_DENY_ALL;
            Ok(())
        }
        _ => {
            if ctx.options().ignore_unknown_extensions {
                warn!("ignoring extension statement {prefix}:{name} on line {line}");
                Ok(())
            } else {
                Err(YangError::UnexpectedStatementInContext(format!(
                    "extension statement {prefix}:{name} on line {line}"
                )))
            }
        }
    }
}

/// Whether `kw` may appear inside a node of the given kind. Header
/// statements common to all data nodes are folded in here.
fn statement_allowed(kind: &NodeKind, kw: &Keyword) -> bool {
    use Keyword::*;
    let header = matches!(
        kw,
        Description | Reference | Status | IfFeature | Extension { .. }
    );
    if header {
        return true;
    }
    match kind {
        NodeKind::Container(_) => matches!(
            kw,
            Config | When | Must | Presence | Typedef | Grouping | Container | Leaf | LeafList
                | List | Choice | Anyxml | Uses
        ),
        NodeKind::List(_) => matches!(
            kw,
            Config | When | Must | Key | Unique | MinElements | MaxElements | OrderedBy | Typedef
                | Grouping | Container | Leaf | LeafList | List | Choice | Anyxml | Uses
        ),
        NodeKind::Leaf(_) => {
            matches!(kw, Config | When | Must | Type | Units | Default | Mandatory)
        }
        NodeKind::LeafList(_) => matches!(
            kw,
            Config | When | Must | Type | Units | MinElements | MaxElements | OrderedBy
        ),
        NodeKind::Choice(_) => matches!(
            kw,
            Config | When | Default | Mandatory | Case | Container | Leaf | LeafList | List
                | Anyxml
        ),
        NodeKind::Case(_) => {
            matches!(kw, When | Container | Leaf | LeafList | List | Choice | Anyxml | Uses)
        }
        NodeKind::AnyXml(_) => matches!(kw, Config | When | Must | Mandatory),
        NodeKind::Uses(_) => matches!(kw, When | Refine | Augment),
        NodeKind::Grouping(_) => matches!(
            kw,
            Typedef | Grouping | Container | Leaf | LeafList | List | Choice | Anyxml | Uses
        ),
        NodeKind::Augment(_) => matches!(
            kw,
            When | Case | Container | Leaf | LeafList | List | Choice | Anyxml | Uses
        ),
        NodeKind::Rpc(_) => matches!(kw, Typedef | Grouping | Input | Output),
        NodeKind::Input(_) | NodeKind::Output(_) => matches!(
            kw,
            Typedef | Grouping | Container | Leaf | LeafList | List | Choice | Anyxml | Uses
        ),
        NodeKind::Notification(_) => matches!(
            kw,
            Typedef | Grouping | Container | Leaf | LeafList | List | Choice | Anyxml | Uses
        ),
    }
}

/// Typedef names may not shadow a built-in type or any typedef visible
/// on the path to the root.
fn check_typedef_name(
    ctx: &Context,
    mid: ModuleId,
    parent: Option<NodeId>,
    name: &str,
) -> YangResult<()> {
    if crate::schema::typ::TypeBase::from_builtin(name).is_some() {
        return Err(YangError::DuplicateIdentifier(format!(
            "typedef {name:?} shadows a built-in type"
        )));
    }
    let mut cur = parent;
    while let Some(id) = cur {
        if ctx.nodes[id].typedefs().iter().any(|t| t.name == name) {
            return Err(YangError::DuplicateIdentifier(format!(
                "typedef {name:?} already defined at {}",
                node::schema_path(ctx, id)
            )));
        }
        cur = ctx.nodes[id].parent;
    }
    let main = node::main_module(ctx, mid);
    for module_id in ctx.module_and_submodules(main) {
        if ctx.module(module_id).find_typedef(name).is_some() {
            return Err(YangError::DuplicateIdentifier(format!(
                "typedef {name:?} already defined in module {}",
                ctx.module(module_id).name
            )));
        }
    }
    Ok(())
}

/// Grouping names are unique within their nearest enclosing scope and
/// everything above it.
fn check_grouping_name(
    ctx: &Context,
    mid: ModuleId,
    parent: Option<NodeId>,
    name: &str,
) -> YangResult<()> {
    let mut level = parent;
    loop {
        let first = match level {
            Some(p) => ctx.nodes[p].child,
            None => ctx.module(node::main_module(ctx, mid)).data,
        };
        for sib in ctx.nodes.chain(first) {
            if matches!(ctx.nodes[sib].kind, NodeKind::Grouping(_)) && ctx.nodes[sib].name == name {
                return Err(YangError::DuplicateIdentifier(format!(
                    "grouping {name:?} already defined at {}",
                    node::schema_path(ctx, sib)
                )));
            }
        }
        match level {
            Some(p) => level = ctx.nodes[p].parent,
            None => break,
        }
    }
    Ok(())
}

// small argument helpers, shared across the build functions

pub(crate) fn arg_required(stmt: &Statement) -> YangResult<&str> {
    match stmt.arg.as_deref() {
        Some(a) => Ok(a),
        None => Err(YangError::MissingRequiredChild(format!(
            "argument of {} on line {}",
            stmt.keyword, stmt.line
        ))),
    }
}

/// Argument constrained to YANG identifier syntax.
fn arg_identifier(stmt: &Statement) -> YangResult<&str> {
    let arg = arg_required(stmt)?;
    if !is_identifier(arg) {
        return Err(YangError::InvalidValue(format!(
            "{} argument {arg:?} on line {} is not an identifier",
            stmt.keyword, stmt.line
        )));
    }
    Ok(arg)
}

/// Argument constrained to `identifier` or `prefix:identifier`.
fn arg_identifier_ref(stmt: &Statement) -> YangResult<&str> {
    let arg = arg_required(stmt)?;
    let ok = match arg.split_once(':') {
        Some((p, n)) => is_identifier(p) && is_identifier(n),
        None => is_identifier(arg),
    };
    if !ok {
        return Err(YangError::InvalidValue(format!(
            "{} argument {arg:?} on line {} is not an identifier reference",
            stmt.keyword, stmt.line
        )));
    }
    Ok(arg)
}

pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
}

fn set_once<T>(slot: &mut Option<T>, value: T, what: &str, line: usize) -> YangResult<()> {
    if slot.is_some() {
        return Err(YangError::DuplicateStatement(format!(
            "{what} on line {line}"
        )));
    }
    *slot = Some(value);
    Ok(())
}

fn parse_bool(stmt: &Statement) -> YangResult<bool> {
    match stmt.arg_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(YangError::InvalidValue(format!(
            "{} expects true or false, found {other:?} on line {}",
            stmt.keyword, stmt.line
        ))),
    }
}

fn parse_status(stmt: &Statement) -> YangResult<Status> {
    match stmt.arg_str() {
        "current" => Ok(Status::Current),
        "deprecated" => Ok(Status::Deprecated),
        "obsolete" => Ok(Status::Obsolete),
        other => Err(YangError::InvalidValue(format!(
            "status {other:?} on line {}",
            stmt.line
        ))),
    }
}

fn parse_min_elements(stmt: &Statement) -> YangResult<u32> {
    stmt.arg_str().parse().map_err(|_| {
        YangError::InvalidValue(format!(
            "min-elements {:?} on line {}",
            stmt.arg_str(),
            stmt.line
        ))
    })
}

/// `max-elements` maps "unbounded" to 0.
fn parse_max_elements(stmt: &Statement) -> YangResult<u32> {
    match stmt.arg_str() {
        "unbounded" => Ok(0),
        other => {
            let v: u32 = other.parse().map_err(|_| {
                YangError::InvalidValue(format!("max-elements {other:?} on line {}", stmt.line))
            })?;
            if v == 0 {
                return Err(YangError::InvalidValue(format!(
                    "max-elements 0 on line {}",
                    stmt.line
                )));
            }
            Ok(v)
        }
    }
}
