use serde::{Deserialize, Serialize};

/// A named, ordered group of CDEs within a form. References CDEs by
/// code only; resolution happens at form-build time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionSpec {
    pub code: String,
    pub display_name: String,

    pub cde_codes: Vec<String>,

    #[serde(default)]
    pub is_repeatable: bool,

    /// Upper bound on instances of a repeatable section. `None` means
    /// unbounded.
    pub max_instances: Option<usize>,
}

impl SectionSpec {
    pub fn new(code: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            display_name: code.clone(),
            code,
            cde_codes: Vec::new(),
            is_repeatable: false,
            max_instances: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_cde(mut self, code: impl Into<String>) -> Self {
        self.cde_codes.push(code.into());
        self
    }

    pub fn with_cdes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cde_codes.extend(codes.into_iter().map(Into::into));
        self
    }

    pub fn repeatable(mut self) -> Self {
        self.is_repeatable = true;
        self
    }

    pub fn with_max_instances(mut self, max_instances: usize) -> Self {
        self.is_repeatable = true;
        self.max_instances = Some(max_instances);
        self
    }
}

/// Declarative form structure: ordered sections plus form-level
/// metadata. Built once per registry definition and cached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormSpec {
    pub name: String,

    pub sections: Vec<SectionSpec>,

    /// Optional applicability expression over CDE values. The form
    /// applies to a patient when it evaluates non-zero against the
    /// patient's current data.
    pub applicability: Option<String>,
}

impl FormSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sections: Vec::new(),
            applicability: None,
        }
    }

    pub fn with_section(mut self, section: SectionSpec) -> Self {
        self.sections.push(section);
        self
    }

    pub fn with_applicability(mut self, expression: impl Into<String>) -> Self {
        self.applicability = Some(expression.into());
        self
    }

    /// Every CDE code referenced by this form, in declaration order.
    pub fn referenced_codes(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .flat_map(|s| s.cde_codes.iter().map(String::as_str))
    }
}
