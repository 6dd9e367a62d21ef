//! Info printer: a human-readable summary of a loaded module.

use std::fmt::Write;

use crate::context::Context;
use crate::schema::node::NodeKind;
use crate::schema::{ModuleId, ModuleKind};

pub fn print_module(ctx: &Context, mid: ModuleId) -> String {
    let module = ctx.module(mid);
    let mut out = String::new();

    match module.kind {
        ModuleKind::Module => {
            let _ = writeln!(out, "Module:       {}", module.name);
        }
        ModuleKind::Submodule { belongs_to } => {
            let _ = writeln!(out, "Submodule:    {}", module.name);
            let _ = writeln!(out, "Belongs-to:   {}", ctx.module(belongs_to).name);
        }
    }
    if let Some(ns) = &module.ns {
        let _ = writeln!(out, "Namespace:    {ns}");
    }
    let _ = writeln!(out, "Prefix:       {}", module.prefix);
    if let Some(rev) = module.revision() {
        let _ = writeln!(out, "Revision:     {rev}");
    }
    if let Some(org) = &module.org {
        let _ = writeln!(out, "Organization: {org}");
    }
    let _ = writeln!(
        out,
        "State:        {}{}",
        if module.implemented { "implemented" } else { "imported" },
        if module.deviated { ", deviated" } else { "" }
    );

    for import in &module.imports {
        let _ = writeln!(out, "Import:       {} (prefix {})", import.name, import.prefix);
    }
    for include in &module.includes {
        let _ = writeln!(out, "Include:      {}", include.name);
    }
    for feature in &module.features {
        let _ = writeln!(
            out,
            "Feature:      {} ({})",
            feature.name,
            if feature.enabled { "on" } else { "off" }
        );
    }
    for ident in &module.identities {
        match &ident.base_name {
            Some(base) => {
                let _ = writeln!(out, "Identity:     {} (base {base})", ident.name);
            }
            None => {
                let _ = writeln!(out, "Identity:     {}", ident.name);
            }
        }
    }
    for tpdf in &module.typedefs {
        let _ = writeln!(out, "Typedef:      {} ({})", tpdf.name, tpdf.typ.name);
    }

    for id in ctx.nodes.chain(module.data) {
        if ctx.nodes[id].module != mid {
            continue;
        }
        let node = &ctx.nodes[id];
        if matches!(node.kind, NodeKind::Augment(_)) {
            continue;
        }
        let _ = writeln!(out, "Data:         {} {}", node.kind.keyword(), node.name);
    }
    if !module.augments.is_empty() {
        let _ = writeln!(out, "Augments:     {}", module.augments.len());
    }
    if !module.deviations.is_empty() {
        let _ = writeln!(out, "Deviations:   {}", module.deviations.len());
    }
    out
}
