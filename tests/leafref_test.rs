use yangfold::{Context, Format, NodeKind, YangError};

#[test]
fn test_circular_leafref_fails() {
    let mut ctx = Context::default();
    let err = ctx
        .parse_module(
            "module F { namespace 'urn:f'; prefix f;
               leaf a { type leafref { path '../b'; } }
               leaf b { type leafref { path '../a'; } }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::CircularLeafref(_)));
}

#[test]
fn test_leafref_target_and_backlink() {
    let mut ctx = Context::default();
    let mid = ctx
        .parse_module(
            "module l { namespace 'urn:l'; prefix l;
               container net {
                 leaf name { type string; }
                 leaf ref { type leafref { path '../name'; } }
               }
             }",
            Format::Yang,
        )
        .unwrap();
    let name = ctx.find_node(mid, "/net/name").unwrap();
    let re = ctx.find_node(mid, "/net/ref").unwrap();
    match &ctx.node(re).kind {
        NodeKind::Leaf(b) => match &b.typ.info {
            yangfold::schema::TypeInfo::Leafref { target, .. } => {
                assert_eq!(*target, Some(name));
            }
            other => panic!("expected leafref, got {other:?}"),
        },
        _ => panic!("expected leaf"),
    }
    match &ctx.node(name).kind {
        NodeKind::Leaf(b) => assert_eq!(b.backlinks, vec![re]),
        _ => panic!("expected leaf"),
    }
}

#[test]
fn test_absolute_leafref_with_predicate() {
    let mut ctx = Context::default();
    let mid = ctx
        .parse_module(
            "module p { namespace 'urn:p'; prefix p;
               list ifc { key 'name';
                 leaf name { type string; }
                 leaf speed { type uint32; }
               }
               leaf fastest {
                 type leafref { path \"/ifc[name = current()/../pick]/speed\"; }
               }
               leaf pick { type string; }
             }",
            Format::Yang,
        )
        .unwrap();
    let speed = ctx.find_node(mid, "/ifc/speed").unwrap();
    let fastest = ctx.find_node(mid, "/fastest").unwrap();
    match &ctx.node(fastest).kind {
        NodeKind::Leaf(b) => match &b.typ.info {
            yangfold::schema::TypeInfo::Leafref { target, .. } => {
                assert_eq!(*target, Some(speed));
            }
            other => panic!("expected leafref, got {other:?}"),
        },
        _ => panic!("expected leaf"),
    }
}

#[test]
fn test_leafref_to_missing_target_fails() {
    let mut ctx = Context::default();
    let err = ctx
        .parse_module(
            "module m { namespace 'urn:m'; prefix m;
               leaf a { type leafref { path '../nothing'; } }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::UnresolvedReference(_)));
}

#[test]
fn test_leafref_in_unused_grouping_unchecked() {
    let mut ctx = Context::default();
    // the path would never resolve, but the grouping is never used
    ctx.parse_module(
        "module g { namespace 'urn:g'; prefix g;
           grouping unused {
             leaf r { type leafref { path '../does-not-exist'; } }
           }
           leaf ok { type string; }
         }",
        Format::Yang,
    )
    .unwrap();
}

#[test]
fn test_leafref_resolved_at_instantiation() {
    let mut ctx = Context::default();
    let mid = ctx
        .parse_module(
            "module i { namespace 'urn:i'; prefix i;
               grouping pair {
                 leaf a { type string; }
                 leaf b { type leafref { path '../a'; } }
               }
               container c { uses pair; }
             }",
            Format::Yang,
        )
        .unwrap();
    let a = ctx.find_node(mid, "/c/a").unwrap();
    let b = ctx.find_node(mid, "/c/b").unwrap();
    match &ctx.node(b).kind {
        NodeKind::Leaf(body) => match &body.typ.info {
            yangfold::schema::TypeInfo::Leafref { target, .. } => {
                // the copy's path resolved against the copied sibling
                assert_eq!(*target, Some(a));
            }
            other => panic!("expected leafref, got {other:?}"),
        },
        _ => panic!("expected leaf"),
    }
}

#[test]
fn test_keys_resolved_in_order() {
    let mut ctx = Context::default();
    let mid = ctx
        .parse_module(
            "module k { namespace 'urn:k'; prefix k;
               list pair { key 'left right';
                 leaf left { type string; }
                 leaf right { type string; }
                 leaf value { type string; }
               }
             }",
            Format::Yang,
        )
        .unwrap();
    let list = ctx.find_node(mid, "/pair").unwrap();
    match &ctx.node(list).kind {
        NodeKind::List(b) => {
            let names: Vec<&str> = b.keys.iter().map(|&k| ctx.node(k).name.as_str()).collect();
            assert_eq!(names, vec!["left", "right"]);
        }
        _ => panic!("expected list"),
    }
}

#[test]
fn test_key_must_be_direct_leaf() {
    let mut ctx = Context::default();
    let err = ctx
        .parse_module(
            "module k { namespace 'urn:k'; prefix k;
               list l { key 'sub'; container sub { } }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::InvalidValue(_)));
}

#[test]
fn test_config_list_requires_key() {
    let mut ctx = Context::default();
    let err = ctx
        .parse_module(
            "module k { namespace 'urn:k'; prefix k;
               list l { leaf v { type string; } }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::MissingRequiredChild(_)));
}

#[test]
fn test_unique_resolves_to_descendant_leaves() {
    let mut ctx = Context::default();
    let mid = ctx
        .parse_module(
            "module u { namespace 'urn:u'; prefix u;
               list srv { key 'name'; unique 'ip port';
                 leaf name { type string; }
                 leaf ip { type string; }
                 leaf port { type uint16; }
               }
             }",
            Format::Yang,
        )
        .unwrap();
    let list = ctx.find_node(mid, "/srv").unwrap();
    match &ctx.node(list).kind {
        NodeKind::List(b) => {
            assert_eq!(b.uniques.len(), 1);
            assert_eq!(b.uniques[0].len(), 2);
            assert_eq!(b.uniques_raw[0].as_str(), "ip port");
        }
        _ => panic!("expected list"),
    }
}

#[test]
fn test_unique_with_duplicate_part_fails() {
    let mut ctx = Context::default();
    let err = ctx
        .parse_module(
            "module u { namespace 'urn:u'; prefix u;
               list l { key 'k'; unique 'v v';
                 leaf k { type string; }
                 leaf v { type string; }
               }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::DuplicateIdentifier(_)));
}
