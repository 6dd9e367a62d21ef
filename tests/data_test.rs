use yangfold::data::{json, validate, xml};
use yangfold::{Context, Format, PrintFlags, YangError};

const MODULE: &str = "module net { namespace 'urn:net'; prefix n;
  container system {
    leaf hostname { type string; mandatory true; }
    leaf mtu { type uint16 { range '68..9216'; } }
    leaf-list dns { type string; max-elements 3; }
    list ifc { key 'name'; min-elements 1;
      leaf name { type string; }
      leaf enabled { type boolean; default 'true'; }
    }
    choice speed {
      leaf auto { type empty; }
      leaf fixed { type uint32; }
    }
  }
}";

fn ctx_with_module() -> Context {
    let mut ctx = Context::default();
    ctx.parse_module(MODULE, Format::Yang).unwrap();
    ctx
}

#[test]
fn test_xml_parse_and_validate() {
    let ctx = ctx_with_module();
    let doc = "<system xmlns='urn:net'>
        <hostname>router1</hostname>
        <mtu>1500</mtu>
        <dns>192.0.2.1</dns>
        <ifc><name>eth0</name><enabled>true</enabled></ifc>
        <fixed>1000</fixed>
      </system>";
    let tree = xml::parse_data(&ctx, doc).unwrap();
    assert_eq!(tree.roots.len(), 1);
    validate::validate(&ctx, &tree).unwrap();
}

#[test]
fn test_missing_mandatory_leaf() {
    let ctx = ctx_with_module();
    let doc = "<system xmlns='urn:net'>
        <ifc><name>eth0</name></ifc>
      </system>";
    let tree = xml::parse_data(&ctx, doc).unwrap();
    let err = validate::validate(&ctx, &tree).unwrap_err();
    assert!(matches!(err, YangError::MissingMandatory(_)));
}

#[test]
fn test_value_type_mismatch() {
    let ctx = ctx_with_module();
    let doc = "<system xmlns='urn:net'>
        <hostname>router1</hostname>
        <mtu>70000</mtu>
        <ifc><name>eth0</name></ifc>
      </system>";
    let tree = xml::parse_data(&ctx, doc).unwrap();
    let err = validate::validate(&ctx, &tree).unwrap_err();
    assert!(matches!(err, YangError::InvalidValue(_)));
}

#[test]
fn test_cardinality_bounds() {
    let ctx = ctx_with_module();
    // no ifc entry at all: min-elements 1
    let doc = "<system xmlns='urn:net'><hostname>r</hostname></system>";
    let tree = xml::parse_data(&ctx, doc).unwrap();
    assert!(matches!(
        validate::validate(&ctx, &tree),
        Err(YangError::MissingMandatory(_))
    ));

    // four dns entries against max-elements 3
    let doc = "<system xmlns='urn:net'>
        <hostname>r</hostname>
        <dns>a</dns><dns>b</dns><dns>c</dns><dns>d</dns>
        <ifc><name>eth0</name></ifc>
      </system>";
    let tree = xml::parse_data(&ctx, doc).unwrap();
    assert!(matches!(
        validate::validate(&ctx, &tree),
        Err(YangError::InvalidValue(_))
    ));
}

#[test]
fn test_duplicate_list_keys() {
    let ctx = ctx_with_module();
    let doc = "<system xmlns='urn:net'>
        <hostname>r</hostname>
        <ifc><name>eth0</name></ifc>
        <ifc><name>eth0</name></ifc>
      </system>";
    let tree = xml::parse_data(&ctx, doc).unwrap();
    let err = validate::validate(&ctx, &tree).unwrap_err();
    assert!(matches!(err, YangError::InvalidValue(_)));
}

#[test]
fn test_choice_single_case() {
    let ctx = ctx_with_module();
    let doc = "<system xmlns='urn:net'>
        <hostname>r</hostname>
        <ifc><name>eth0</name></ifc>
        <auto/>
        <fixed>100</fixed>
      </system>";
    let tree = xml::parse_data(&ctx, doc).unwrap();
    let err = validate::validate(&ctx, &tree).unwrap_err();
    assert!(matches!(err, YangError::InvalidValue(_)));
}

#[test]
fn test_unknown_element_rejected() {
    let ctx = ctx_with_module();
    let doc = "<system xmlns='urn:net'><bogus>1</bogus></system>";
    let err = xml::parse_data(&ctx, doc).unwrap_err();
    assert!(matches!(err, YangError::InvalidValue(_)));
}

#[test]
fn test_xml_round_trip() {
    let ctx = ctx_with_module();
    let doc = "<system xmlns='urn:net'>
        <hostname>router1</hostname>
        <ifc><name>eth0</name></ifc>
      </system>";
    let tree = xml::parse_data(&ctx, doc).unwrap();
    let printed = xml::print_data(
        &ctx,
        &tree,
        &PrintFlags {
            format: false,
            with_siblings: true,
            with_defaults: false,
        },
    )
    .unwrap();
    let again = xml::parse_data(&ctx, &printed).unwrap();
    assert_eq!(again.roots.len(), 1);
    assert_eq!(again.roots[0].children.len(), tree.roots[0].children.len());
}

#[test]
fn test_json_print_qualifies_top_level() {
    let ctx = ctx_with_module();
    let doc = "<system xmlns='urn:net'>
        <hostname>router1</hostname>
        <mtu>1500</mtu>
        <ifc><name>eth0</name></ifc>
      </system>";
    let tree = xml::parse_data(&ctx, doc).unwrap();
    let out = json::print_data(
        &ctx,
        &tree,
        &PrintFlags {
            format: false,
            with_siblings: true,
            with_defaults: false,
        },
    )
    .unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    let system = &value["net:system"];
    assert_eq!(system["hostname"], "router1");
    // mtu is 16 bits, printed as a JSON number
    assert_eq!(system["mtu"], 1500);
    assert!(system["ifc"].is_array());
}

#[test]
fn test_with_defaults_attribute() {
    let mut ctx = Context::default();
    ctx.parse_module(MODULE, Format::Yang).unwrap();
    ctx.parse_module(
        "module ietf-netconf-with-defaults {
           namespace 'urn:ietf:params:xml:ns:yang:ietf-netconf-with-defaults';
           prefix ncwd;
         }",
        Format::Yang,
    )
    .unwrap();

    let doc = "<system xmlns='urn:net'>
        <hostname>r</hostname>
        <ifc><name>eth0</name></ifc>
      </system>";
    let mut tree = xml::parse_data(&ctx, doc).unwrap();
    for root in &mut tree.roots {
        xml::add_defaults(&ctx, root);
    }
    let printed = xml::print_data(
        &ctx,
        &tree,
        &PrintFlags {
            format: true,
            with_siblings: true,
            with_defaults: true,
        },
    )
    .unwrap();
    // the defaulted enabled leaf carries the marker attribute
    assert!(printed.contains("ncwd:default=\"true\""));
    assert!(printed.contains("<enabled"));
}
