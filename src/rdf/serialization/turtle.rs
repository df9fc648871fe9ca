//! Turtle and N-Triples implementation (rio)

use crate::rdf::{
    Triple, NamedNode, BlankNode, Literal, RdfSubject, RdfPredicate, RdfObject
};
use super::{ParseResult, SerializeResult, ParseError, SerializeError};
use oxiri::Iri;
use rio_api::formatter::TriplesFormatter;
use rio_api::model;
use rio_api::parser::TriplesParser;
use rio_turtle::{NTriplesFormatter, NTriplesParser, TurtleError, TurtleFormatter, TurtleParser};
use std::io::Cursor;

impl From<TurtleError> for ParseError {
    fn from(e: TurtleError) -> Self {
        ParseError::Parse(e.to_string())
    }
}

/// Turtle parser
pub struct TurtleParserWrapper;

impl TurtleParserWrapper {
    /// Parse Turtle string to Triples. Relative IRIs resolve against `base_iri`.
    pub fn parse(input: &str, base_iri: Option<&str>) -> ParseResult<Vec<Triple>> {
        let base = base_iri
            .map(|b| {
                Iri::parse(b.to_string())
                    .map_err(|e| ParseError::InvalidBase(b.to_string(), e.to_string()))
            })
            .transpose()?;

        let mut parser = TurtleParser::new(Cursor::new(input), base);
        collect(&mut parser)
    }
}

/// N-Triples parser
pub struct NTriplesParserWrapper;

impl NTriplesParserWrapper {
    /// Parse N-Triples string to Triples (N-Triples has absolute IRIs only)
    pub fn parse(input: &str) -> ParseResult<Vec<Triple>> {
        let mut parser = NTriplesParser::new(Cursor::new(input));
        collect(&mut parser)
    }
}

fn collect<P>(parser: &mut P) -> ParseResult<Vec<Triple>>
where
    P: TriplesParser<Error = TurtleError>,
{
    let mut triples = Vec::new();
    parser.parse_all(&mut |t| -> Result<(), ParseError> {
        let subject = convert_subject(t.subject)?;
        let predicate = convert_predicate(t.predicate)?;
        let object = convert_object(t.object)?;

        triples.push(Triple::new(subject, predicate, object));
        Ok(())
    })?;
    Ok(triples)
}

/// Turtle serializer
pub struct TurtleSerializerWrapper;

impl TurtleSerializerWrapper {
    /// Serialize Triples to Turtle string
    pub fn serialize(triples: &[Triple]) -> SerializeResult<String> {
        let mut output = Vec::new();
        let mut formatter = TurtleFormatter::new(&mut output);
        for triple in triples {
            format_triple(&mut formatter, triple)?;
        }
        formatter.finish()?;

        String::from_utf8(output)
            .map_err(|e| SerializeError::Serialize(e.to_string()))
    }
}

/// N-Triples serializer
pub struct NTriplesSerializerWrapper;

impl NTriplesSerializerWrapper {
    /// Serialize Triples to N-Triples string
    pub fn serialize(triples: &[Triple]) -> SerializeResult<String> {
        let mut output = Vec::new();
        let mut formatter = NTriplesFormatter::new(&mut output);
        for triple in triples {
            format_triple(&mut formatter, triple)?;
        }
        formatter.finish()?;

        String::from_utf8(output)
            .map_err(|e| SerializeError::Serialize(e.to_string()))
    }
}

fn format_triple<F>(formatter: &mut F, triple: &Triple) -> SerializeResult<()>
where
    F: TriplesFormatter<Error = std::io::Error>,
{
    let subject = match &triple.subject {
        RdfSubject::NamedNode(n) => model::Subject::NamedNode(model::NamedNode { iri: n.as_str() }),
        RdfSubject::BlankNode(b) => model::Subject::BlankNode(model::BlankNode { id: b.as_str() }),
    };

    let predicate = model::NamedNode { iri: triple.predicate.as_str() };

    let datatype;
    let object = match &triple.object {
        RdfObject::NamedNode(n) => model::Term::NamedNode(model::NamedNode { iri: n.as_str() }),
        RdfObject::BlankNode(b) => model::Term::BlankNode(model::BlankNode { id: b.as_str() }),
        RdfObject::Literal(l) => {
            let literal = if let Some(language) = l.language() {
                model::Literal::LanguageTaggedString { value: l.value(), language }
            } else if l.is_plain() {
                model::Literal::Simple { value: l.value() }
            } else {
                datatype = l.datatype();
                model::Literal::Typed {
                    value: l.value(),
                    datatype: model::NamedNode { iri: datatype.as_str() },
                }
            };
            model::Term::Literal(literal)
        }
    };

    formatter.format(&model::Triple { subject, predicate, object })?;
    Ok(())
}

fn convert_subject(s: model::Subject) -> Result<RdfSubject, ParseError> {
    match s {
        model::Subject::NamedNode(n) => {
            Ok(RdfSubject::NamedNode(NamedNode::new(n.iri).map_err(|e| ParseError::Parse(e.to_string()))?))
        },
        model::Subject::BlankNode(b) => {
            Ok(RdfSubject::BlankNode(BlankNode::from_id(b.id).map_err(|e| ParseError::Parse(e.to_string()))?))
        },
        _ => Err(ParseError::Unsupported("quoted triple as subject".to_string())),
    }
}

fn convert_predicate(p: model::NamedNode) -> Result<RdfPredicate, ParseError> {
    RdfPredicate::new(p.iri).map_err(|e| ParseError::Parse(e.to_string()))
}

fn convert_object(o: model::Term) -> Result<RdfObject, ParseError> {
    match o {
        model::Term::NamedNode(n) => {
            Ok(RdfObject::NamedNode(NamedNode::new(n.iri).map_err(|e| ParseError::Parse(e.to_string()))?))
        },
        model::Term::BlankNode(b) => {
            Ok(RdfObject::BlankNode(BlankNode::from_id(b.id).map_err(|e| ParseError::Parse(e.to_string()))?))
        },
        model::Term::Literal(l) => {
            match l {
                model::Literal::Simple { value } => {
                    Ok(RdfObject::Literal(Literal::new_simple_literal(value)))
                },
                model::Literal::LanguageTaggedString { value, language } => {
                    Ok(RdfObject::Literal(
                        Literal::new_language_tagged_literal(value, language)
                            .map_err(|e| ParseError::Parse(e.to_string()))?
                    ))
                },
                model::Literal::Typed { value, datatype } => {
                    let dt = NamedNode::new(datatype.iri)
                        .map_err(|e| ParseError::Parse(e.to_string()))?;
                    Ok(RdfObject::Literal(Literal::new_typed_literal(value, dt)))
                }
            }
        },
        _ => Err(ParseError::Unsupported("quoted triple as object".to_string())),
    }
}
