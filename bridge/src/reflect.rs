//! Member reflection and report rendering
//!
//! Rust has no runtime reflection, so host types carry an explicit
//! [`TypeDescriptor`] describing their callable/readable/writable surface.
//! `describe` filters a descriptor into a [`MemberReport`]; `describe_value`
//! is the script-side variant that walks a rhai value's own properties.
//! Both are read-only and produce reports on demand, never cached.

use crate::value::HostHandle;
use rhai::{Dynamic, FnPtr};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Conventional map key linking a rhai object map to its prototype map.
pub const PROTO_KEY: &str = "__proto__";

/// Declared visibility of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodMember {
    pub name: String,
    /// Parameter type names, in declaration order.
    pub params: Vec<String>,
    pub is_static: bool,
    pub inherited: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMember {
    pub name: String,
    pub ty: String,
    pub is_static: bool,
    pub inherited: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyMember {
    pub name: String,
    pub ty: String,
    pub readable: bool,
    pub writable: bool,
    pub visibility: Visibility,
    pub is_static: bool,
    pub inherited: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMember {
    pub name: String,
    /// Handler signature, e.g. `fn(u64)`.
    pub handler: String,
    pub is_static: bool,
    pub inherited: bool,
}

/// Full member surface of a host type, in declaration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub name: String,
    /// Name of the base type the inherited members came from, if any.
    pub base: Option<String>,
    pub methods: Vec<MethodMember>,
    pub fields: Vec<FieldMember>,
    pub properties: Vec<PropertyMember>,
    pub events: Vec<EventMember>,
}

impl TypeDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn method(mut self, name: &str, params: &[&str]) -> Self {
        self.methods.push(MethodMember {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            is_static: false,
            inherited: false,
        });
        self
    }

    pub fn static_method(mut self, name: &str, params: &[&str]) -> Self {
        self.methods.push(MethodMember {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            is_static: true,
            inherited: false,
        });
        self
    }

    pub fn field(mut self, name: &str, ty: &str) -> Self {
        self.fields.push(FieldMember {
            name: name.to_string(),
            ty: ty.to_string(),
            is_static: false,
            inherited: false,
        });
        self
    }

    pub fn property(mut self, name: &str, ty: &str, writable: bool) -> Self {
        self.properties.push(PropertyMember {
            name: name.to_string(),
            ty: ty.to_string(),
            readable: true,
            writable,
            visibility: Visibility::Public,
            is_static: false,
            inherited: false,
        });
        self
    }

    pub fn private_property(mut self, name: &str, ty: &str, writable: bool) -> Self {
        self.properties.push(PropertyMember {
            name: name.to_string(),
            ty: ty.to_string(),
            readable: true,
            writable,
            visibility: Visibility::Private,
            is_static: false,
            inherited: false,
        });
        self
    }

    pub fn static_property(mut self, name: &str, ty: &str) -> Self {
        self.properties.push(PropertyMember {
            name: name.to_string(),
            ty: ty.to_string(),
            readable: true,
            writable: false,
            visibility: Visibility::Public,
            is_static: true,
            inherited: false,
        });
        self
    }

    pub fn event(mut self, name: &str, handler: &str) -> Self {
        self.events.push(EventMember {
            name: name.to_string(),
            handler: handler.to_string(),
            is_static: false,
            inherited: false,
        });
        self
    }

    /// Append every member of `base` flagged as inherited.
    pub fn inherit(mut self, base: &TypeDescriptor) -> Self {
        self.base = Some(base.name.clone());
        for m in &base.methods {
            let mut m = m.clone();
            m.inherited = true;
            self.methods.push(m);
        }
        for m in &base.fields {
            let mut m = m.clone();
            m.inherited = true;
            self.fields.push(m);
        }
        for m in &base.properties {
            let mut m = m.clone();
            m.inherited = true;
            self.properties.push(m);
        }
        for m in &base.events {
            let mut m = m.clone();
            m.inherited = true;
            self.events.push(m);
        }
        self
    }
}

/// Selects which members of a descriptor end up in a report.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemberFilter {
    /// Static members when true, instance members when false.
    pub statics: bool,
    /// Exclude members inherited from a base type.
    pub declared_only: bool,
}

impl MemberFilter {
    pub fn new(statics: bool, declared_only: bool) -> Self {
        Self {
            statics,
            declared_only,
        }
    }

    fn keeps(&self, is_static: bool, inherited: bool) -> bool {
        is_static == self.statics && !(self.declared_only && inherited)
    }
}

/// One section of a member report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSection {
    Methods,
    Fields,
    Properties,
    Events,
    All,
}

impl FromStr for ReportSection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "methods" => Ok(ReportSection::Methods),
            "fields" => Ok(ReportSection::Fields),
            "properties" => Ok(ReportSection::Properties),
            "events" => Ok(ReportSection::Events),
            "all" => Ok(ReportSection::All),
            _ => Err(()),
        }
    }
}

/// Rendered-on-demand description of a type's or value's members.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberReport {
    pub type_name: String,
    pub methods: Vec<MethodMember>,
    pub fields: Vec<FieldMember>,
    pub properties: Vec<PropertyMember>,
    pub events: Vec<EventMember>,
}

impl MemberReport {
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
            && self.fields.is_empty()
            && self.properties.is_empty()
            && self.events.is_empty()
    }

    /// Render one section (or everything) as indented text.
    pub fn render(&self, section: ReportSection) -> String {
        let mut out = format!("=== {} ===\n", self.type_name);
        let all = section == ReportSection::All;

        if (all || section == ReportSection::Methods) && !self.methods.is_empty() {
            out.push_str("[methods]\n");
            for m in &self.methods {
                out.push_str(&format!("  {}({})", m.name, m.params.join(", ")));
                if m.is_static {
                    out.push_str(" [static]");
                }
                if m.inherited {
                    out.push_str(" [inherited]");
                }
                out.push('\n');
            }
        }
        if (all || section == ReportSection::Fields) && !self.fields.is_empty() {
            out.push_str("[fields]\n");
            for m in &self.fields {
                out.push_str(&format!("  {}: {}", m.name, m.ty));
                if m.is_static {
                    out.push_str(" [static]");
                }
                if m.inherited {
                    out.push_str(" [inherited]");
                }
                out.push('\n');
            }
        }
        if (all || section == ReportSection::Properties) && !self.properties.is_empty() {
            out.push_str("[properties]\n");
            for m in &self.properties {
                let access = match (m.readable, m.writable) {
                    (true, true) => "get; set",
                    (true, false) => "get",
                    (false, true) => "set",
                    (false, false) => "",
                };
                out.push_str(&format!(
                    "  {}: {} {{ {} }} ({})",
                    m.name, m.ty, access, m.visibility
                ));
                if m.is_static {
                    out.push_str(" [static]");
                }
                if m.inherited {
                    out.push_str(" [inherited]");
                }
                out.push('\n');
            }
        }
        if (all || section == ReportSection::Events) && !self.events.is_empty() {
            out.push_str("[events]\n");
            for m in &self.events {
                out.push_str(&format!("  {}: {}", m.name, m.handler));
                if m.is_static {
                    out.push_str(" [static]");
                }
                if m.inherited {
                    out.push_str(" [inherited]");
                }
                out.push('\n');
            }
        }
        out
    }
}

impl fmt::Display for MemberReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(ReportSection::All))
    }
}

/// Produce a filtered report from a host type descriptor.
pub fn describe(descriptor: &TypeDescriptor, filter: &MemberFilter) -> MemberReport {
    MemberReport {
        type_name: descriptor.name.clone(),
        methods: descriptor
            .methods
            .iter()
            .filter(|m| filter.keeps(m.is_static, m.inherited))
            .cloned()
            .collect(),
        fields: descriptor
            .fields
            .iter()
            .filter(|m| filter.keeps(m.is_static, m.inherited))
            .cloned()
            .collect(),
        properties: descriptor
            .properties
            .iter()
            .filter(|m| filter.keeps(m.is_static, m.inherited))
            .cloned()
            .collect(),
        events: descriptor
            .events
            .iter()
            .filter(|m| filter.keeps(m.is_static, m.inherited))
            .cloned()
            .collect(),
    }
}

/// Lookup table of descriptors for every type visible to one engine instance.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, TypeDescriptor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later inserts under the same name win.
    pub fn insert(&mut self, descriptor: TypeDescriptor) {
        self.types.insert(descriptor.name.clone(), descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Describe a script-side value by walking its own properties.
///
/// Object maps produce one report of their entries; function-pointer entries
/// are listed as methods, everything else as fields. With `walk_chain`, a map
/// entry under [`PROTO_KEY`] is followed link by link, producing one report
/// per prototype. Bound host objects fall back to their registered
/// descriptor; primitives produce an empty report naming the type.
pub fn describe_value(
    value: &Dynamic,
    walk_chain: bool,
    registry: &TypeRegistry,
) -> Vec<MemberReport> {
    if let Some(handle) = value.clone().try_cast::<HostHandle>() {
        let report = match registry.get(handle.type_name()) {
            Some(descriptor) => MemberReport {
                type_name: descriptor.name.clone(),
                methods: descriptor.methods.clone(),
                fields: descriptor.fields.clone(),
                properties: descriptor.properties.clone(),
                events: descriptor.events.clone(),
            },
            None => MemberReport {
                type_name: handle.type_name().to_string(),
                ..Default::default()
            },
        };
        return vec![report];
    }

    let mut reports = Vec::new();
    let mut current = value.clone();
    loop {
        let map = match current.read_lock::<rhai::Map>() {
            Some(map) => map.clone(),
            None => {
                if reports.is_empty() {
                    reports.push(MemberReport {
                        type_name: pretty_type_name(current.type_name()).to_string(),
                        ..Default::default()
                    });
                }
                break;
            }
        };

        let mut report = MemberReport {
            type_name: if reports.is_empty() {
                "object".to_string()
            } else {
                format!("prototype #{}", reports.len())
            },
            ..Default::default()
        };
        for (key, entry) in map.iter() {
            if key.as_str() == PROTO_KEY {
                continue;
            }
            if let Some(fp) = entry.clone().try_cast::<FnPtr>() {
                report.methods.push(MethodMember {
                    name: key.to_string(),
                    params: vec![format!("fn {}", fp.fn_name())],
                    is_static: false,
                    inherited: false,
                });
            } else {
                report.fields.push(FieldMember {
                    name: key.to_string(),
                    ty: pretty_type_name(entry.type_name()).to_string(),
                    is_static: false,
                    inherited: false,
                });
            }
        }
        reports.push(report);

        if !walk_chain {
            break;
        }
        match map.get(PROTO_KEY) {
            Some(proto) => current = proto.clone(),
            None => break,
        }
    }
    reports
}

/// Strip crate paths and map rhai's internal names to script-facing ones.
pub fn pretty_type_name(raw: &str) -> &str {
    match raw {
        "i64" => "int",
        "f64" => "float",
        "alloc::string::String" | "string" => "string",
        other => other.rsplit("::").next().unwrap_or(other),
    }
}
