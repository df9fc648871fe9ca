//! JSON-LD format implementation
//!
//! The parser covers the document shapes LDP clients send in practice: an
//! inline `@context` (prefixes, `@vocab`, `@language`, expanded term
//! definitions), `@graph`, `@id`, `@type`, value objects, nested node
//! objects and blank nodes. Remote contexts and lists are rejected.

use crate::rdf::namespace::{rdf, xsd, NamespaceManager};
use crate::rdf::{BlankNode, Literal, NamedNode, RdfObject, RdfPredicate, RdfSubject, Triple};
use super::{ParseError, ParseResult, SerializeError, SerializeResult};
use indexmap::IndexMap;
use oxiri::Iri;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Coercion declared by a term definition
#[derive(Debug, Clone, PartialEq)]
enum Coercion {
    Id,
    Datatype(String),
}

#[derive(Debug, Clone, Default)]
struct TermDefinition {
    iri: String,
    coercion: Option<Coercion>,
    language: Option<String>,
}

/// Active context while walking the document
#[derive(Debug, Clone, Default)]
struct Context {
    base: Option<Iri<String>>,
    vocab: Option<String>,
    language: Option<String>,
    terms: HashMap<String, TermDefinition>,
}

impl Context {
    fn with_local(&self, local: &Value) -> ParseResult<Context> {
        let mut ctx = self.clone();
        match local {
            Value::Null => Ok(Context { base: self.base.clone(), ..Context::default() }),
            Value::Array(items) => {
                for item in items {
                    ctx = ctx.with_local(item)?;
                }
                Ok(ctx)
            }
            Value::String(url) => Err(ParseError::Unsupported(format!("remote context {}", url))),
            Value::Object(defs) => {
                if let Some(vocab) = defs.get("@vocab") {
                    ctx.vocab = vocab.as_str().map(str::to_string);
                }
                if let Some(language) = defs.get("@language") {
                    ctx.language = language.as_str().map(str::to_string);
                }

                // prefixes first, so terms may reference them regardless of key order
                for (term, def) in defs {
                    if let Some(iri) = def.as_str().filter(|_| !term.starts_with('@')) {
                        ctx.terms.insert(
                            term.clone(),
                            TermDefinition { iri: iri.to_string(), ..TermDefinition::default() },
                        );
                    }
                }

                let mut resolved = Vec::new();
                for (term, def) in defs {
                    if term.starts_with('@') {
                        continue;
                    }
                    let definition = match def {
                        Value::String(iri) => TermDefinition {
                            iri: ctx.expand_iri(iri, false).unwrap_or_else(|| iri.clone()),
                            ..TermDefinition::default()
                        },
                        Value::Object(expanded) => {
                            let id = expanded
                                .get("@id")
                                .and_then(Value::as_str)
                                .unwrap_or(term.as_str());
                            let coercion = match expanded.get("@type").and_then(Value::as_str) {
                                Some("@id") | Some("@vocab") => Some(Coercion::Id),
                                Some(dt) => Some(Coercion::Datatype(
                                    ctx.expand_iri(dt, true).unwrap_or_else(|| dt.to_string()),
                                )),
                                None => None,
                            };
                            TermDefinition {
                                iri: ctx.expand_iri(id, true).unwrap_or_else(|| id.to_string()),
                                coercion,
                                language: expanded
                                    .get("@language")
                                    .and_then(Value::as_str)
                                    .map(str::to_string),
                            }
                        }
                        Value::Null => {
                            ctx.terms.remove(term);
                            continue;
                        }
                        other => {
                            return Err(ParseError::Parse(format!(
                                "invalid term definition for {}: {}",
                                term, other
                            )))
                        }
                    };
                    resolved.push((term.clone(), definition));
                }
                ctx.terms.extend(resolved);
                Ok(ctx)
            }
            other => Err(ParseError::Parse(format!("invalid @context: {}", other))),
        }
    }

    /// Expand a term, compact IRI, absolute IRI or relative reference.
    ///
    /// `vocab` selects vocabulary-relative expansion (keys and `@type`);
    /// otherwise relative references resolve against the document base.
    fn expand_iri(&self, value: &str, vocab: bool) -> Option<String> {
        if value.starts_with("_:") {
            return Some(value.to_string());
        }
        if vocab {
            if let Some(def) = self.terms.get(value) {
                return Some(def.iri.clone());
            }
        }
        if let Some((prefix, suffix)) = value.split_once(':') {
            if !suffix.starts_with("//") {
                if let Some(def) = self.terms.get(prefix) {
                    return Some(format!("{}{}", def.iri, suffix));
                }
            }
            if Iri::parse(value).is_ok() {
                return Some(value.to_string());
            }
        }
        if vocab {
            return self.vocab.as_ref().map(|v| format!("{}{}", v, value));
        }
        match &self.base {
            Some(base) => base.resolve(value).ok().map(Iri::into_inner),
            None => None,
        }
    }
}

/// JSON-LD parser
pub struct JsonLdParserWrapper;

impl JsonLdParserWrapper {
    /// Parse JSON-LD string to Triples
    pub fn parse(input: &str, base_iri: Option<&str>) -> ParseResult<Vec<Triple>> {
        let document: Value = serde_json::from_str(input)
            .map_err(|e| ParseError::Parse(e.to_string()))?;

        let base = base_iri
            .map(|b| {
                Iri::parse(b.to_string())
                    .map_err(|e| ParseError::InvalidBase(b.to_string(), e.to_string()))
            })
            .transpose()?;

        let mut walker = Walker {
            triples: Vec::new(),
            blank_nodes: HashMap::new(),
        };
        let ctx = Context { base, ..Context::default() };
        walker.top_level(&document, &ctx)?;
        Ok(walker.triples)
    }
}

struct Walker {
    triples: Vec<Triple>,
    blank_nodes: HashMap<String, BlankNode>,
}

impl Walker {
    fn top_level(&mut self, value: &Value, ctx: &Context) -> ParseResult<()> {
        match value {
            Value::Array(items) => {
                for item in items {
                    self.top_level(item, ctx)?;
                }
                Ok(())
            }
            Value::Object(obj) => {
                let ctx = match obj.get("@context") {
                    Some(local) => ctx.with_local(local)?,
                    None => ctx.clone(),
                };
                match obj.get("@graph") {
                    // a bare @graph wrapper has no node of its own
                    Some(graph) if obj.keys().all(|k| k == "@context" || k == "@graph") => {
                        self.top_level(graph, &ctx)
                    }
                    _ => self.node(obj, &ctx).map(|_| ()),
                }
            }
            other => Err(ParseError::Parse(format!("expected node object, found {}", other))),
        }
    }

    fn blank(&mut self, label: &str) -> ParseResult<BlankNode> {
        if let Some(node) = self.blank_nodes.get(label) {
            return Ok(node.clone());
        }
        let node = BlankNode::from_id(label.trim_start_matches("_:"))
            .map_err(|e| ParseError::Parse(e.to_string()))?;
        self.blank_nodes.insert(label.to_string(), node.clone());
        Ok(node)
    }

    fn subject_for(&mut self, iri: &str) -> ParseResult<RdfSubject> {
        if iri.starts_with("_:") {
            Ok(self.blank(iri)?.into())
        } else {
            Ok(named(iri)?.into())
        }
    }

    fn node(&mut self, obj: &Map<String, Value>, outer: &Context) -> ParseResult<RdfSubject> {
        let ctx = match obj.get("@context") {
            Some(local) => outer.with_local(local)?,
            None => outer.clone(),
        };

        let subject = match obj.get("@id").and_then(Value::as_str) {
            Some(id) => {
                let iri = ctx
                    .expand_iri(id, false)
                    .ok_or_else(|| ParseError::Parse(format!("cannot resolve @id {}", id)))?;
                self.subject_for(&iri)?
            }
            None => BlankNode::new().into(),
        };

        for (key, value) in obj {
            match key.as_str() {
                "@context" | "@id" => {}
                "@type" => {
                    let predicate = RdfPredicate::new(rdf::TYPE)
                        .map_err(|e| ParseError::Parse(e.to_string()))?;
                    for ty in as_list(value) {
                        let ty = ty.as_str().ok_or_else(|| {
                            ParseError::Parse(format!("@type must be a string, found {}", ty))
                        })?;
                        let iri = ctx
                            .expand_iri(ty, true)
                            .ok_or_else(|| ParseError::Parse(format!("cannot expand type {}", ty)))?;
                        let object: RdfObject = if iri.starts_with("_:") {
                            self.blank(&iri)?.into()
                        } else {
                            named(&iri)?.into()
                        };
                        self.triples.push(Triple::new(subject.clone(), predicate.clone(), object));
                    }
                }
                "@graph" => self.top_level(value, &ctx)?,
                "@list" | "@set" | "@reverse" | "@included" | "@nest" => {
                    return Err(ParseError::Unsupported(key.clone()));
                }
                k if k.starts_with('@') => {}
                _ => {
                    // properties that do not expand to an IRI are dropped
                    let Some(iri) = ctx.expand_iri(key, true) else { continue };
                    if iri.starts_with("_:") {
                        continue;
                    }
                    let predicate = RdfPredicate::new(iri.as_str())
                        .map_err(|e| ParseError::Parse(e.to_string()))?;
                    let definition = ctx.terms.get(key).cloned();
                    for item in as_list(value) {
                        if let Some(object) = self.object(item, definition.as_ref(), &ctx)? {
                            self.triples.push(Triple::new(subject.clone(), predicate.clone(), object));
                        }
                    }
                }
            }
        }

        Ok(subject)
    }

    fn object(
        &mut self,
        value: &Value,
        definition: Option<&TermDefinition>,
        ctx: &Context,
    ) -> ParseResult<Option<RdfObject>> {
        let coercion = definition.and_then(|d| d.coercion.clone());
        let object: RdfObject = match value {
            Value::Null => return Ok(None),
            Value::String(s) => match coercion {
                Some(Coercion::Id) => {
                    let iri = ctx
                        .expand_iri(s, false)
                        .ok_or_else(|| ParseError::Parse(format!("cannot resolve {}", s)))?;
                    if iri.starts_with("_:") {
                        self.blank(&iri)?.into()
                    } else {
                        named(&iri)?.into()
                    }
                }
                Some(Coercion::Datatype(dt)) => Literal::new_typed_literal(s.as_str(), named(&dt)?).into(),
                None => {
                    let language = definition
                        .and_then(|d| d.language.clone())
                        .or_else(|| ctx.language.clone());
                    match language {
                        Some(lang) => Literal::new_language_tagged_literal(s.as_str(), lang)
                            .map_err(|e| ParseError::Parse(e.to_string()))?
                            .into(),
                        None => Literal::new_simple_literal(s.as_str()).into(),
                    }
                }
            },
            Value::Bool(b) => Literal::new_typed_literal(b.to_string(), named(xsd::BOOLEAN)?).into(),
            Value::Number(n) => {
                let datatype = if n.is_f64() { xsd::DOUBLE } else { xsd::INTEGER };
                Literal::new_typed_literal(n.to_string(), named(datatype)?).into()
            }
            Value::Array(_) => {
                return Err(ParseError::Unsupported("nested arrays".to_string()));
            }
            Value::Object(obj) => {
                if let Some(v) = obj.get("@value") {
                    let lexical = match v {
                        Value::String(s) => s.clone(),
                        Value::Null => return Ok(None),
                        other => other.to_string(),
                    };
                    if let Some(lang) = obj.get("@language").and_then(Value::as_str) {
                        Literal::new_language_tagged_literal(lexical, lang)
                            .map_err(|e| ParseError::Parse(e.to_string()))?
                            .into()
                    } else if let Some(dt) = obj.get("@type").and_then(Value::as_str) {
                        let dt = ctx
                            .expand_iri(dt, true)
                            .ok_or_else(|| ParseError::Parse(format!("cannot expand datatype {}", dt)))?;
                        Literal::new_typed_literal(lexical, named(&dt)?).into()
                    } else {
                        match v {
                            Value::Bool(_) => Literal::new_typed_literal(lexical, named(xsd::BOOLEAN)?).into(),
                            Value::Number(n) if n.is_f64() => {
                                Literal::new_typed_literal(lexical, named(xsd::DOUBLE)?).into()
                            }
                            Value::Number(_) => Literal::new_typed_literal(lexical, named(xsd::INTEGER)?).into(),
                            _ => Literal::new_simple_literal(lexical).into(),
                        }
                    }
                } else if obj.contains_key("@list") {
                    return Err(ParseError::Unsupported("@list".to_string()));
                } else {
                    match self.node(obj, ctx)? {
                        RdfSubject::NamedNode(n) => n.into(),
                        RdfSubject::BlankNode(b) => b.into(),
                    }
                }
            }
        };
        Ok(Some(object))
    }
}

fn as_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn named(iri: &str) -> ParseResult<NamedNode> {
    NamedNode::new(iri).map_err(|e| ParseError::Parse(e.to_string()))
}

/// JSON-LD serializer
pub struct JsonLdSerializerWrapper;

impl JsonLdSerializerWrapper {
    /// Serialize Triples to a JSON-LD document.
    ///
    /// Predicates and types are compacted with the well-known prefixes,
    /// which are declared in `@context`. Node objects keep the order in
    /// which their subjects first appear.
    pub fn serialize(triples: &[Triple]) -> SerializeResult<String> {
        let namespaces = NamespaceManager::new();
        let mut context = Map::new();
        let mut nodes: IndexMap<String, Map<String, Value>> = IndexMap::new();

        let compact = |iri: &str, context: &mut Map<String, Value>| -> String {
            match namespaces.compact(iri) {
                Some((prefix, compacted)) => {
                    if let Ok(ns) = namespaces.get_iri(prefix) {
                        context.insert(prefix.to_string(), json!(ns));
                    }
                    compacted
                }
                None => iri.to_string(),
            }
        };

        for triple in triples {
            let s_key = match &triple.subject {
                RdfSubject::NamedNode(n) => n.as_str().to_string(),
                RdfSubject::BlankNode(b) => b.to_string(),
            };
            let node = nodes.entry(s_key.clone()).or_insert_with(|| {
                let mut m = Map::new();
                m.insert("@id".to_string(), json!(s_key));
                m
            });

            if triple.predicate.as_str() == rdf::TYPE {
                let ty = match &triple.object {
                    RdfObject::NamedNode(n) => Some(compact(n.as_str(), &mut context)),
                    RdfObject::BlankNode(b) => Some(b.to_string()),
                    RdfObject::Literal(_) => None,
                };
                if let Some(ty) = ty {
                    push(node, "@type", json!(ty));
                    continue;
                }
            }

            let o_val = match &triple.object {
                RdfObject::NamedNode(n) => json!({ "@id": n.as_str() }),
                RdfObject::BlankNode(b) => json!({ "@id": b.to_string() }),
                RdfObject::Literal(l) => {
                    if let Some(lang) = l.language() {
                        json!({ "@value": l.value(), "@language": lang })
                    } else if l.is_plain() {
                        json!({ "@value": l.value() })
                    } else {
                        json!({ "@value": l.value(), "@type": l.datatype().as_str() })
                    }
                }
            };

            let p_key = compact(triple.predicate.as_str(), &mut context);
            push(node, &p_key, o_val);
        }

        let graph: Vec<Value> = nodes.into_values().map(Value::Object).collect();
        let document = json!({
            "@context": Value::Object(context),
            "@graph": graph,
        });

        serde_json::to_string_pretty(&document)
            .map_err(|e| SerializeError::Serialize(e.to_string()))
    }
}

fn push(node: &mut Map<String, Value>, key: &str, value: Value) {
    match node.get_mut(key) {
        Some(Value::Array(items)) => items.push(value),
        _ => {
            node.insert(key.to_string(), Value::Array(vec![value]));
        }
    }
}
