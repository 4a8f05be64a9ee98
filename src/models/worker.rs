use serde::Serialize;

/// Shop-floor operator, owned by the worker directory.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Worker {
    pub id: String,
    pub name: String,
    pub role: String,
    pub productive: bool,             // ⇔ workers.productive (INT 0/1)
    pub productivity_pct: Option<u8>, // ⇔ workers.productivity_pct (NULL when unknown)
}

impl Worker {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            role: "operator".to_string(),
            productive: true,
            productivity_pct: None,
        }
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.role = role.to_string();
        self
    }

    pub fn with_productivity(mut self, pct: Option<u8>) -> Self {
        self.productivity_pct = pct;
        self
    }

    pub fn non_productive(mut self) -> Self {
        self.productive = false;
        self
    }

    pub fn productivity_label(&self) -> String {
        match (self.productive, self.productivity_pct) {
            (false, _) => "non-productive".to_string(),
            (true, Some(p)) => format!("{p}%"),
            (true, None) => "productive".to_string(),
        }
    }
}
