use std::collections::HashMap;

use crate::{Action, ModuleCode};

/// Maps request paths to the module guarding them.
///
/// A path is matched segment by segment (a leading `api` segment is skipped); the first segment
/// with a known mapping decides.
#[derive(Debug, Clone)]
pub struct RouteMap {
    segments: HashMap<String, ModuleCode>,
}

impl Default for RouteMap {
    fn default() -> Self {
        let mut map = RouteMap::empty();
        map.insert_all(
            ModuleCode::Production,
            &["formularios", "atividades", "opds", "comentarios", "dashboard", "sinprod"],
        );
        map.insert_all(
            ModuleCode::Quality,
            &["qualidade", "nao-conformidade", "reclamacao-cliente", "acao-corretiva", "cq-config"],
        );
        map.insert_all(
            ModuleCode::Sales,
            &["comercial", "clientes", "propostas", "vendedores", "precos"],
        );
        map.insert_all(ModuleCode::Admin, &["admin", "usuarios", "perfis", "modulos"]);
        map
    }
}

impl RouteMap {
    pub fn empty() -> Self {
        RouteMap {
            segments: HashMap::new(),
        }
    }

    pub fn insert(&mut self, segment: &str, module: ModuleCode) -> &mut Self {
        self.segments.insert(segment.to_string(), module);
        self
    }

    pub fn insert_all(&mut self, module: ModuleCode, segments: &[&str]) -> &mut Self {
        for segment in segments {
            self.insert(segment, module);
        }
        self
    }

    pub fn module_for_path(&self, path: &str) -> Option<ModuleCode> {
        let mut segments = path.split('/').filter(|s| !s.is_empty()).peekable();
        if segments.peek() == Some(&"api") {
            segments.next();
        }
        segments.find_map(|segment| self.segments.get(segment).copied())
    }
}

impl Action {
    /// Action implied by an HTTP method. Unknown methods are treated as reads.
    pub fn for_http_method(method: &str) -> Action {
        match method.to_ascii_uppercase().as_str() {
            "POST" => Action::Create,
            "PUT" | "PATCH" => Action::Edit,
            "DELETE" => Action::Delete,
            _ => Action::View,
        }
    }
}
