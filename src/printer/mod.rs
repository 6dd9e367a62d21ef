//! Schema printers: YANG text, YIN, tree view and info summary.
//!
//! The YANG and YIN printers share one traversal: a sealed module is
//! lowered back into the abstract [`Statement`] tree, and each surface
//! syntax serialises that tree, mirroring how the readers work.

pub mod info;
pub mod tree;
pub mod yang;
pub mod yin;

use std::collections::HashSet;

use crate::context::Context;
use crate::parser::statement::{Keyword, Statement};
use crate::schema::node::{self, Must, NodeKind, Refine, Status, When};
use crate::schema::typ::{RawTypeSpec, Restr, YangType};
use crate::schema::{
    Deviate, DeviateKind, ExternalKind, FeatureRef, ModuleId, ModuleKind, NodeId, Typedef,
    YangVersion,
};

fn stmt(kw: Keyword, arg: &str) -> Statement {
    Statement::new(kw, Some(arg.to_string()), 0)
}

fn stmt_noarg(kw: Keyword) -> Statement {
    Statement::new(kw, None, 0)
}

/// Lower a sealed module (or submodule) back into its statement tree.
pub(crate) fn module_statements(ctx: &Context, mid: ModuleId) -> Statement {
    let module = ctx.module(mid);
    let mut root = match module.kind {
        ModuleKind::Module => stmt(Keyword::Module, &module.name),
        ModuleKind::Submodule { .. } => stmt(Keyword::Submodule, &module.name),
    };

    if module.version == YangVersion::V1_1 {
        root.children.push(stmt(Keyword::YangVersion, "1.1"));
    }
    match module.kind {
        ModuleKind::Module => {
            if let Some(ns) = &module.ns {
                root.children.push(stmt(Keyword::Namespace, ns));
            }
            root.children.push(stmt(Keyword::Prefix, &module.prefix));
        }
        ModuleKind::Submodule { belongs_to } => {
            let mut belongs = stmt(Keyword::BelongsTo, &ctx.module(belongs_to).name);
            belongs.children.push(stmt(Keyword::Prefix, &module.prefix));
            root.children.push(belongs);
        }
    }

    for import in &module.imports {
        if import.external != ExternalKind::Local {
            continue;
        }
        let mut s = stmt(Keyword::Import, &import.name);
        s.children.push(stmt(Keyword::Prefix, &import.prefix));
        if let Some(rev) = &import.revision {
            s.children.push(stmt(Keyword::RevisionDate, rev));
        }
        root.children.push(s);
    }
    for include in &module.includes {
        let mut s = stmt(Keyword::Include, &include.name);
        if let Some(rev) = &include.revision {
            s.children.push(stmt(Keyword::RevisionDate, rev));
        }
        root.children.push(s);
    }

    push_opt(&mut root, Keyword::Organization, module.org.as_deref());
    push_opt(&mut root, Keyword::Contact, module.contact.as_deref());
    push_opt(&mut root, Keyword::Description, module.dsc.as_deref());
    push_opt(&mut root, Keyword::Reference, module.reference.as_deref());

    for rev in &module.revisions {
        let mut s = stmt(Keyword::Revision, &rev.date);
        push_opt(&mut s, Keyword::Description, rev.dsc.as_deref());
        push_opt(&mut s, Keyword::Reference, rev.reference.as_deref());
        root.children.push(s);
    }

    for feature in &module.features {
        let mut s = stmt(Keyword::Feature, &feature.name);
        for fref in &feature.iffeatures {
            s.children
                .push(stmt(Keyword::IfFeature, &feature_ref_str(ctx, mid, *fref)));
        }
        push_status(&mut s, feature.status);
        push_opt(&mut s, Keyword::Description, feature.dsc.as_deref());
        push_opt(&mut s, Keyword::Reference, feature.reference.as_deref());
        root.children.push(s);
    }

    for ident in &module.identities {
        let mut s = stmt(Keyword::Identity, &ident.name);
        if let Some(base) = &ident.base_name {
            s.children.push(stmt(Keyword::Base, base));
        }
        push_status(&mut s, ident.status);
        push_opt(&mut s, Keyword::Description, ident.dsc.as_deref());
        push_opt(&mut s, Keyword::Reference, ident.reference.as_deref());
        root.children.push(s);
    }

    for tpdf in &module.typedefs {
        root.children.push(typedef_statement(tpdf));
    }

    // splices stay with their augment statement, not with the target
    let skip = spliced_children(ctx, mid);
    let chain_owner = match module.kind {
        ModuleKind::Module => module.data,
        ModuleKind::Submodule { belongs_to } => ctx.module(belongs_to).data,
    };
    for id in ctx.nodes.chain(chain_owner) {
        if ctx.nodes[id].module != mid || skip.contains(&id) {
            continue;
        }
        root.children.push(node_statement(ctx, id));
    }

    for &aug in &module.augments {
        root.children.push(augment_statement(ctx, aug));
    }

    for dev in &module.deviations {
        let mut s = stmt(Keyword::Deviation, &dev.target_path);
        push_opt(&mut s, Keyword::Description, dev.dsc.as_deref());
        push_opt(&mut s, Keyword::Reference, dev.reference.as_deref());
        for dv in &dev.deviates {
            s.children.push(deviate_statement(dv));
        }
        root.children.push(s);
    }

    root
}

/// All node ids spliced into targets by this module's augments.
fn spliced_children(ctx: &Context, mid: ModuleId) -> HashSet<NodeId> {
    let mut out = HashSet::new();
    for &aug in &ctx.module(mid).augments {
        if let NodeKind::Augment(a) = &ctx.nodes[aug].kind {
            out.extend(a.spliced.iter().copied());
        }
    }
    out
}

fn push_opt(parent: &mut Statement, kw: Keyword, arg: Option<&str>) {
    if let Some(a) = arg {
        parent.children.push(stmt(kw, a));
    }
}

fn push_status(parent: &mut Statement, status: Status) {
    if status != Status::Current {
        parent.children.push(stmt(Keyword::Status, status.as_str()));
    }
}

/// Render an `if-feature` reference back to `prefix:name` form.
fn feature_ref_str(ctx: &Context, from: ModuleId, fref: FeatureRef) -> String {
    let name = ctx.module(fref.module).features[fref.index].name.clone();
    let from_main = node::main_module(ctx, from);
    let target_main = node::main_module(ctx, fref.module);
    if from_main == target_main {
        return name.to_string();
    }
    let prefix = ctx
        .module(from)
        .imports
        .iter()
        .find(|i| i.external == ExternalKind::Local && i.module == Some(target_main))
        .map(|i| i.prefix.clone());
    match prefix {
        Some(p) => format!("{p}:{name}"),
        None => name.to_string(),
    }
}

fn typedef_statement(tpdf: &Typedef) -> Statement {
    let mut s = stmt(Keyword::Typedef, &tpdf.name);
    s.children.push(type_statement(&tpdf.typ));
    push_opt(&mut s, Keyword::Units, tpdf.units.as_deref());
    push_opt(&mut s, Keyword::Default, tpdf.default.as_deref());
    push_status(&mut s, tpdf.status);
    push_opt(&mut s, Keyword::Description, tpdf.dsc.as_deref());
    push_opt(&mut s, Keyword::Reference, tpdf.reference.as_deref());
    s
}

/// Types print what was written on them, kept verbatim in the local
/// spec; inherited typedef payload is never re-emitted.
fn type_statement(typ: &YangType) -> Statement {
    let name = match &typ.prefix {
        Some(p) => format!("{p}:{}", typ.name),
        None => typ.name.to_string(),
    };
    let mut s = stmt(Keyword::Type, &name);
    spec_children(&mut s, &typ.local);
    s
}

fn spec_children(s: &mut Statement, spec: &RawTypeSpec) {
    if let Some(digits) = spec.fraction_digits {
        s.children
            .push(stmt(Keyword::FractionDigits, &digits.to_string()));
    }
    if let Some(range) = &spec.range {
        s.children.push(restr_statement(Keyword::Range, range));
    }
    if let Some(length) = &spec.length {
        s.children.push(restr_statement(Keyword::Length, length));
    }
    for pat in &spec.patterns {
        let restr = Restr {
            expr: pat.expr.clone(),
            dsc: pat.dsc.clone(),
            reference: pat.reference.clone(),
            emsg: pat.emsg.clone(),
            eapptag: pat.eapptag.clone(),
        };
        s.children.push(restr_statement(Keyword::Pattern, &restr));
    }
    for ev in &spec.enums {
        let mut e = stmt(Keyword::Enum, &ev.name);
        if !ev.auto {
            e.children.push(stmt(Keyword::Value, &ev.value.to_string()));
        }
        push_opt(&mut e, Keyword::Description, ev.dsc.as_deref());
        push_opt(&mut e, Keyword::Reference, ev.reference.as_deref());
        s.children.push(e);
    }
    for bit in &spec.bits {
        let mut b = stmt(Keyword::Bit, &bit.name);
        if !bit.auto {
            b.children
                .push(stmt(Keyword::Position, &bit.pos.to_string()));
        }
        push_opt(&mut b, Keyword::Description, bit.dsc.as_deref());
        push_opt(&mut b, Keyword::Reference, bit.reference.as_deref());
        s.children.push(b);
    }
    if let Some(path) = &spec.path {
        s.children.push(stmt(Keyword::Path, path));
    }
    if let Some(ri) = spec.require_instance {
        s.children
            .push(stmt(Keyword::RequireInstance, if ri { "true" } else { "false" }));
    }
    if let Some(base) = &spec.ident_base {
        s.children.push(stmt(Keyword::Base, base));
    }
    for member in &spec.union_types {
        s.children.push(type_statement(member));
    }
}

fn restr_statement(kw: Keyword, restr: &Restr) -> Statement {
    let mut s = stmt(kw, &restr.expr);
    push_opt(&mut s, Keyword::ErrorMessage, restr.emsg.as_deref());
    push_opt(&mut s, Keyword::ErrorAppTag, restr.eapptag.as_deref());
    push_opt(&mut s, Keyword::Description, restr.dsc.as_deref());
    push_opt(&mut s, Keyword::Reference, restr.reference.as_deref());
    s
}

fn must_statement(must: &Must) -> Statement {
    let mut s = stmt(Keyword::Must, &must.expr);
    push_opt(&mut s, Keyword::ErrorMessage, must.emsg.as_deref());
    push_opt(&mut s, Keyword::ErrorAppTag, must.eapptag.as_deref());
    push_opt(&mut s, Keyword::Description, must.dsc.as_deref());
    push_opt(&mut s, Keyword::Reference, must.reference.as_deref());
    s
}

fn when_statement(when: &When) -> Statement {
    let mut s = stmt(Keyword::When, &when.cond);
    push_opt(&mut s, Keyword::Description, when.dsc.as_deref());
    push_opt(&mut s, Keyword::Reference, when.reference.as_deref());
    s
}

fn refine_statement(refine: &Refine) -> Statement {
    let mut s = stmt(Keyword::Refine, &refine.target_path);
    push_opt(&mut s, Keyword::Description, refine.dsc.as_deref());
    push_opt(&mut s, Keyword::Reference, refine.reference.as_deref());
    push_opt(&mut s, Keyword::Presence, refine.presence.as_deref());
    push_opt(&mut s, Keyword::Default, refine.default.as_deref());
    if let Some(c) = refine.config {
        s.children.push(stmt(Keyword::Config, bool_str(c)));
    }
    if let Some(m) = refine.mandatory {
        s.children.push(stmt(Keyword::Mandatory, bool_str(m)));
    }
    if let Some(min) = refine.min {
        s.children.push(stmt(Keyword::MinElements, &min.to_string()));
    }
    if let Some(max) = refine.max {
        s.children.push(stmt(Keyword::MaxElements, &max_str(max)));
    }
    for must in &refine.musts {
        s.children.push(must_statement(must));
    }
    s
}

fn deviate_statement(dv: &Deviate) -> Statement {
    let mut s = stmt(Keyword::Deviate, dv.kind.as_str());
    if dv.kind == DeviateKind::NotSupported {
        return s;
    }
    push_opt(&mut s, Keyword::Units, dv.units.as_deref());
    for must in &dv.musts {
        s.children.push(must_statement(must));
    }
    for unique in &dv.uniques {
        s.children.push(stmt(Keyword::Unique, unique));
    }
    push_opt(&mut s, Keyword::Default, dv.default.as_deref());
    if let Some(c) = dv.config {
        s.children.push(stmt(Keyword::Config, bool_str(c)));
    }
    if let Some(m) = dv.mandatory {
        s.children.push(stmt(Keyword::Mandatory, bool_str(m)));
    }
    if let Some(min) = dv.min {
        s.children.push(stmt(Keyword::MinElements, &min.to_string()));
    }
    if let Some(max) = dv.max {
        s.children.push(stmt(Keyword::MaxElements, &max_str(max)));
    }
    if let Some(typ) = &dv.typ {
        s.children.push(type_statement(typ));
    }
    s
}

fn bool_str(v: bool) -> &'static str {
    if v {
        "true"
    } else {
        "false"
    }
}

fn max_str(max: u32) -> String {
    if max == 0 {
        "unbounded".to_string()
    } else {
        max.to_string()
    }
}

fn augment_statement(ctx: &Context, aug: NodeId) -> Statement {
    let node = &ctx.nodes[aug];
    let (path, when, spliced) = match &node.kind {
        NodeKind::Augment(a) => (a.target_path.clone(), a.when.clone(), a.spliced.clone()),
        _ => (node.name.clone(), None, Vec::new()),
    };
    let mut s = stmt(Keyword::Augment, &path);
    if let Some(w) = &when {
        s.children.push(when_statement(w));
    }
    for child in spliced {
        s.children.push(node_statement(ctx, child));
    }
    // an unapplied augment still owns its children
    for child in ctx.nodes.chain(node.child) {
        s.children.push(node_statement(ctx, child));
    }
    s
}

fn node_statement(ctx: &Context, id: NodeId) -> Statement {
    let node = &ctx.nodes[id];
    let mut s = match &node.kind {
        NodeKind::Container(_) => stmt(Keyword::Container, &node.name),
        NodeKind::List(_) => stmt(Keyword::List, &node.name),
        NodeKind::Leaf(_) => stmt(Keyword::Leaf, &node.name),
        NodeKind::LeafList(_) => stmt(Keyword::LeafList, &node.name),
        NodeKind::Choice(_) => stmt(Keyword::Choice, &node.name),
        NodeKind::Case(_) => stmt(Keyword::Case, &node.name),
        NodeKind::AnyXml(_) => stmt(Keyword::Anyxml, &node.name),
        NodeKind::Uses(u) => stmt(Keyword::Uses, &u.grouping_name),
        NodeKind::Grouping(_) => stmt(Keyword::Grouping, &node.name),
        NodeKind::Augment(_) => return augment_statement(ctx, id),
        NodeKind::Rpc(_) => stmt(Keyword::Rpc, &node.name),
        NodeKind::Input(_) => stmt_noarg(Keyword::Input),
        NodeKind::Output(_) => stmt_noarg(Keyword::Output),
        NodeKind::Notification(_) => stmt(Keyword::Notification, &node.name),
    };

    if let Some(when) = node.when() {
        s.children.push(when_statement(when));
    }
    for fref in &node.iffeatures {
        s.children
            .push(stmt(Keyword::IfFeature, &feature_ref_str(ctx, node.module, *fref)));
    }
    for must in node.musts() {
        s.children.push(must_statement(must));
    }

    match &node.kind {
        NodeKind::Container(b) => {
            push_opt(&mut s, Keyword::Presence, b.presence.as_deref());
        }
        NodeKind::Leaf(b) => {
            s.children.push(type_statement(&b.typ));
            push_opt(&mut s, Keyword::Units, b.units.as_deref());
            push_opt(&mut s, Keyword::Default, b.default.as_deref());
        }
        NodeKind::LeafList(b) => {
            s.children.push(type_statement(&b.typ));
            push_opt(&mut s, Keyword::Units, b.units.as_deref());
        }
        NodeKind::List(b) => {
            if !b.keys.is_empty() {
                let keys = b
                    .keys
                    .iter()
                    .map(|&k| ctx.nodes[k].name.to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                s.children.push(stmt(Keyword::Key, &keys));
            }
            for unique in &b.uniques_raw {
                s.children.push(stmt(Keyword::Unique, unique));
            }
        }
        NodeKind::Choice(b) => {
            if let Some(default) = b.default {
                let name = ctx.nodes[default].name.to_string();
                s.children.push(stmt(Keyword::Default, &name));
            }
        }
        _ => {}
    }

    if node.config_set {
        s.children.push(stmt(Keyword::Config, bool_str(node.config)));
    }
    if node.mandatory_set {
        s.children
            .push(stmt(Keyword::Mandatory, bool_str(node.mandatory)));
    }
    match &node.kind {
        NodeKind::List(b) => {
            if b.min_set {
                s.children.push(stmt(Keyword::MinElements, &b.min.to_string()));
            }
            if b.max_set {
                s.children.push(stmt(Keyword::MaxElements, &max_str(b.max)));
            }
            if b.ordered_by_user {
                s.children.push(stmt(Keyword::OrderedBy, "user"));
            }
        }
        NodeKind::LeafList(b) => {
            if b.min_set {
                s.children.push(stmt(Keyword::MinElements, &b.min.to_string()));
            }
            if b.max_set {
                s.children.push(stmt(Keyword::MaxElements, &max_str(b.max)));
            }
            if b.ordered_by_user {
                s.children.push(stmt(Keyword::OrderedBy, "user"));
            }
        }
        _ => {}
    }

    push_status(&mut s, node.status);
    push_opt(&mut s, Keyword::Description, node.dsc.as_deref());
    push_opt(&mut s, Keyword::Reference, node.reference.as_deref());

    for tpdf in node.typedefs() {
        s.children.push(typedef_statement(tpdf));
    }

    match &node.kind {
        // the children of a uses are its instantiated copies; the text
        // form carries the refines and augments instead
        NodeKind::Uses(u) => {
            for refine in &u.refines {
                s.children.push(refine_statement(refine));
            }
            for &aug in &u.augments {
                s.children.push(augment_statement(ctx, aug));
            }
        }
        NodeKind::Leaf(_) | NodeKind::LeafList(_) | NodeKind::AnyXml(_) => {}
        _ => {
            for child in ctx.nodes.chain(node.child) {
                s.children.push(node_statement(ctx, child));
            }
        }
    }

    s
}
