//! The link pass.
//!
//! Linking is a pure function of the registry state and the database:
//! running it twice yields the same output. Each active component is
//! relocated to `<ns>:lib/<component path>/...`, its macro tokens
//! (`__key__`) and the local signatures of itself and its requirements
//! (`<component ns>:<rel path>`) are rewritten in a single left-to-right
//! scan that tries longer tokens first.

use crate::database::{ComponentSource, ProcedureSource};
use crate::error::{LinkError, LinkResult};
use crate::manifest::{is_relative_inside, ComponentManifest};
use crate::registry::ComponentRegistry;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, info};

/// One relocated library procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedProcedure {
    pub component: String,
    /// Dotted id (`math.float.add`).
    pub id: String,
    /// Final signature (`<ns>:lib/math/float/add`).
    pub signature: String,
    /// Path relative to the function directory, without extension.
    pub path: String,
    pub lines: Vec<String>,
}

/// One copied static resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedResource {
    pub component: String,
    /// Path relative to the output root.
    pub path: String,
    pub contents: String,
}

/// Everything the link pass produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkOutput {
    /// Components in dependency order (requirements first).
    pub order: Vec<String>,
    pub procedures: Vec<LinkedProcedure>,
    pub resources: Vec<LinkedResource>,
    /// Signatures of `onInitialize` procedures in dependency order.
    pub init_calls: Vec<String>,
}

// ══════════════════════════════════════════════════════════════════════════════
// Token substitution
// ══════════════════════════════════════════════════════════════════════════════

/// Token → replacement table applied in one scan, longest token first.
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    tokens: Vec<(String, String)>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a replacement; empty tokens and duplicate tokens are ignored.
    pub fn insert(&mut self, token: impl Into<String>, replacement: impl Into<String>) {
        let token = token.into();
        if token.is_empty() || self.tokens.iter().any(|(t, _)| *t == token) {
            return;
        }
        self.tokens.push((token, replacement.into()));
        self.tokens
            .sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Replace every token occurrence. Replacement text is never rescanned.
    pub fn apply(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        'scan: while let Some(ch) = rest.chars().next() {
            for (token, replacement) in &self.tokens {
                if rest.starts_with(token.as_str()) {
                    out.push_str(replacement);
                    rest = &rest[token.len()..];
                    continue 'scan;
                }
            }
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
        out
    }
}

/// First `__name__` macro token left in `text`, if any. Names are ASCII
/// alphanumerics with inner underscores.
fn unbound_token(text: &str) -> Option<&str> {
    let mut from = 0;
    while let Some(offset) = text[from..].find("__") {
        let start = from + offset;
        let name_start = start + 2;
        let rest = &text[name_start..];
        if let Some(len) = rest.find("__") {
            let name = &rest[..len];
            let valid = !name.is_empty()
                && !name.starts_with('_')
                && !name.ends_with('_')
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if valid {
                return Some(&text[start..name_start + len + 2]);
            }
        }
        from = start + 1;
    }
    None
}

/// Source lines that survive into the output: no blanks, no comments.
fn significant_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
}

// ══════════════════════════════════════════════════════════════════════════════
// Link
// ══════════════════════════════════════════════════════════════════════════════

struct Symbol {
    local: String,
    signature: String,
}

impl ComponentRegistry {
    /// Resolve every active component against `source`.
    ///
    /// Requirements of active components are activated transitively and
    /// inherit the bindings of the component that requires them. Fails on
    /// the first malformed or missing component and on any macro token
    /// left without a binding.
    pub fn link(&mut self, source: &dyn ComponentSource) -> LinkResult<LinkOutput> {
        let manifests = self.activate_requirements(source)?;
        let order = dependency_order(&manifests)?;
        info!(components = order.len(), "linking components");

        let mut sources: IndexMap<String, Vec<ProcedureSource>> = IndexMap::new();
        let mut symbols: IndexMap<String, Vec<Symbol>> = IndexMap::new();
        let mut known: IndexSet<String> = IndexSet::new();
        for id in &order {
            let procs = source.read_component_procedure_sources(id)?;
            let namespace = &manifests[id].namespace;
            let table = procs
                .iter()
                .map(|p| {
                    let dotted = format!("{id}.{}", p.dotted());
                    known.insert(dotted.clone());
                    Symbol {
                        local: format!("{namespace}:{}", p.rel_path),
                        signature: self.signature_of(&dotted),
                    }
                })
                .collect();
            symbols.insert(id.clone(), table);
            sources.insert(id.clone(), procs);
        }

        if let Some(missing) = self.referenced.iter().find(|r| !known.contains(*r)) {
            return Err(LinkError::UnresolvedReference(missing.clone()));
        }

        let mut output = LinkOutput {
            order: order.clone(),
            ..LinkOutput::default()
        };
        for id in &order {
            let manifest = &manifests[id];
            let subs = self.substitutions_for(id, manifest, &symbols);
            for proc in &sources[id] {
                let dotted = format!("{id}.{}", proc.dotted());
                let lines: Vec<String> =
                    significant_lines(&proc.text).map(|l| subs.apply(l)).collect();
                if let Some(token) = lines.iter().find_map(|l| unbound_token(l)) {
                    return Err(LinkError::UnboundMacro {
                        component: id.clone(),
                        item: proc.rel_path.clone(),
                        token: token.to_string(),
                    });
                }
                output.procedures.push(LinkedProcedure {
                    component: id.clone(),
                    signature: self.signature_of(&dotted),
                    path: ComponentRegistry::relative_path_of(&dotted),
                    lines,
                    id: dotted,
                });
            }
            for rule in &manifest.copy {
                let raw = source.read_component_resource(id, &rule.from)?;
                let contents = if rule.substitute { subs.apply(&raw) } else { raw };
                let path = subs.apply(&rule.to);
                if !is_relative_inside(&path) {
                    return Err(LinkError::MalformedManifest {
                        component: id.clone(),
                        reason: format!("copy target '{path}' leaves the output root"),
                    });
                }
                if let Some(token) = unbound_token(&path) {
                    return Err(LinkError::UnboundMacro {
                        component: id.clone(),
                        item: rule.to.clone(),
                        token: token.to_string(),
                    });
                }
                output.resources.push(LinkedResource {
                    component: id.clone(),
                    path,
                    contents,
                });
            }
            if let Some(init) = &manifest.on_initialize {
                let dotted = format!("{id}.{init}");
                if !known.contains(&dotted) {
                    return Err(LinkError::UnknownProcedure {
                        component: id.clone(),
                        item: init.clone(),
                    });
                }
                output.init_calls.push(self.signature_of(&dotted));
            }
            debug!(component = %id, procedures = sources[id].len(), "component linked");
        }
        Ok(output)
    }

    /// Read manifests of every active component, activating requirements.
    fn activate_requirements(
        &mut self,
        source: &dyn ComponentSource,
    ) -> LinkResult<IndexMap<String, ComponentManifest>> {
        let mut manifests = IndexMap::new();
        let mut queue: VecDeque<String> = self.loaded.keys().cloned().collect();
        while let Some(id) = queue.pop_front() {
            if manifests.contains_key(&id) {
                continue;
            }
            let manifest = source.read_component_manifest(&id)?;
            for required in &manifest.requires {
                if !self.is_declared(required) {
                    return Err(LinkError::UnknownRequirement {
                        component: id.clone(),
                        required: required.clone(),
                    });
                }
                if !self.is_loaded(required) {
                    debug!(component = %required, by = %id, "activated as requirement");
                    let inherited = self.loaded.get(&id).cloned().unwrap_or_default();
                    self.loaded.insert(required.clone(), inherited);
                }
                queue.push_back(required.clone());
            }
            manifests.insert(id, manifest);
        }
        Ok(manifests)
    }

    fn substitutions_for(
        &self,
        id: &str,
        manifest: &ComponentManifest,
        symbols: &IndexMap<String, Vec<Symbol>>,
    ) -> Substitutions {
        let mut subs = Substitutions::new();
        if let Some(bindings) = self.loaded.get(id) {
            for (key, value) in bindings {
                subs.insert(format!("__{key}__"), value.clone());
            }
        }
        let visible = std::iter::once(id).chain(manifest.requires.iter().map(String::as_str));
        for component in visible {
            for symbol in symbols.get(component).into_iter().flatten() {
                subs.insert(symbol.local.clone(), symbol.signature.clone());
            }
        }
        subs
    }
}

/// Order components so that every requirement precedes its dependents.
/// Ties keep activation order.
fn dependency_order(manifests: &IndexMap<String, ComponentManifest>) -> LinkResult<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit(
        id: &str,
        manifests: &IndexMap<String, ComponentManifest>,
        marks: &mut IndexMap<String, Mark>,
        path: &mut Vec<String>,
        order: &mut Vec<String>,
    ) -> LinkResult<()> {
        match marks.get(id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                path.push(id.to_string());
                return Err(LinkError::DependencyCycle(path.join(" -> ")));
            }
            None => {}
        }
        marks.insert(id.to_string(), Mark::Visiting);
        path.push(id.to_string());
        if let Some(manifest) = manifests.get(id) {
            for required in &manifest.requires {
                visit(required, manifests, marks, path, order)?;
            }
        }
        path.pop();
        marks.insert(id.to_string(), Mark::Done);
        order.push(id.to_string());
        Ok(())
    }

    let mut marks = IndexMap::new();
    let mut order = Vec::with_capacity(manifests.len());
    for id in manifests.keys() {
        visit(id, manifests, &mut marks, &mut Vec::new(), &mut order)?;
    }
    Ok(order)
}
