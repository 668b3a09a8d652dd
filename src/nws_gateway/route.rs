// nws_gateway - HTTP gateway for api.weather.gov
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

//! Declarative routes: path templates, typed parameters, and bindings to upstream operations.
//!
//! A path template is made of `/` separated segments. Each segment is either a literal
//! (`zones`), a placeholder (`{zone_id}`), or a mix of both (`{x:int},{y:int}`). Placeholders
//! may carry a type, one of `str` (the default), `int`, or `float`.

use crate::upstream::{Argument, Operation, ParamValue, Query};
use axum::http::Method;
use percent_encoding::percent_decode_str;
use std::collections::HashSet;
use std::error;
use std::fmt;
use std::str::FromStr;

/// Semantic type of a parameter, used to coerce the raw string from a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Float,
}

impl ParamType {
    fn coerce(self, name: &'static str, raw: &str) -> Result<ParamValue, BindError> {
        let invalid = || BindError::Invalid(name, self, raw.to_owned());
        match self {
            Self::String => Ok(ParamValue::String(raw.to_owned())),
            Self::Integer => raw.parse::<i64>().map(ParamValue::Integer).map_err(|_| invalid()),
            Self::Float => match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(ParamValue::Float(v)),
                _ => Err(invalid()),
            },
        }
    }

    fn sample(self, index: usize) -> ParamValue {
        match self {
            Self::String => ParamValue::String(format!("v{}", index)),
            Self::Integer => ParamValue::Integer(index as i64),
            Self::Float => ParamValue::Float(index as f64 + 0.5),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
        }
    }
}

impl FromStr for ParamType {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "str" => Ok(Self::String),
            "int" => Ok(Self::Integer),
            "float" => Ok(Self::Float),
            _ => Err(TemplateError::UnknownType(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    Path,
    Query,
}

/// Declaration of a single parameter accepted by a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub source: ParamSource,
    pub kind: ParamType,
    pub required: bool,
}

impl ParameterSpec {
    pub fn path(name: &'static str, kind: ParamType) -> Self {
        ParameterSpec {
            name,
            source: ParamSource::Path,
            kind,
            required: true,
        }
    }

    pub fn query(name: &'static str, kind: ParamType) -> Self {
        ParameterSpec {
            name,
            source: ParamSource::Query,
            kind,
            required: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    MissingLeadingSlash,
    EmptySegment,
    UnclosedPlaceholder,
    UnexpectedBrace,
    InvalidName(String),
    UnknownType(String),
    DuplicateName(String),
    AdjacentPlaceholders(String),
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingLeadingSlash => write!(f, "template must start with '/'"),
            Self::EmptySegment => write!(f, "template contains an empty segment"),
            Self::UnclosedPlaceholder => write!(f, "unclosed placeholder"),
            Self::UnexpectedBrace => write!(f, "unexpected '}}'"),
            Self::InvalidName(n) => write!(f, "invalid placeholder name '{}'", n),
            Self::UnknownType(t) => write!(f, "unknown placeholder type '{}'", t),
            Self::DuplicateName(n) => write!(f, "duplicate placeholder '{}'", n),
            Self::AdjacentPlaceholders(s) => write!(f, "adjacent placeholders in segment '{}'", s),
        }
    }
}

impl error::Error for TemplateError {}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(&'static str),
    Param(&'static str),
}

/// Parsed path template.
#[derive(Debug, Clone)]
pub struct Template {
    source: &'static str,
    segments: Vec<Vec<Piece>>,
    params: Vec<ParameterSpec>,
}

impl Template {
    pub fn parse(source: &'static str) -> Result<Self, TemplateError> {
        let body = source.strip_prefix('/').ok_or(TemplateError::MissingLeadingSlash)?;
        let mut segments = Vec::new();
        let mut params: Vec<ParameterSpec> = Vec::new();

        for segment in body.split('/') {
            if segment.is_empty() {
                return Err(TemplateError::EmptySegment);
            }

            let pieces = Self::parse_segment(segment, &mut params)?;
            segments.push(pieces);
        }

        Ok(Template {
            source,
            segments,
            params,
        })
    }

    fn parse_segment(
        segment: &'static str,
        params: &mut Vec<ParameterSpec>,
    ) -> Result<Vec<Piece>, TemplateError> {
        let mut pieces = Vec::new();
        let mut rest = segment;

        while !rest.is_empty() {
            match rest.find(|c: char| c == '{' || c == '}') {
                Some(i) if rest.as_bytes()[i] == b'}' => return Err(TemplateError::UnexpectedBrace),
                Some(0) => {
                    let end = rest.find('}').ok_or(TemplateError::UnclosedPlaceholder)?;
                    let (name, kind) = match rest[1..end].split_once(':') {
                        Some((name, kind)) => (name, kind.parse::<ParamType>()?),
                        None => (&rest[1..end], ParamType::String),
                    };

                    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                        return Err(TemplateError::InvalidName(name.to_owned()));
                    }
                    if params.iter().any(|p| p.name == name) {
                        return Err(TemplateError::DuplicateName(name.to_owned()));
                    }
                    if let Some(Piece::Param(_)) = pieces.last() {
                        return Err(TemplateError::AdjacentPlaceholders(segment.to_owned()));
                    }

                    params.push(ParameterSpec::path(name, kind));
                    pieces.push(Piece::Param(name));
                    rest = &rest[end + 1..];
                }
                Some(i) => {
                    pieces.push(Piece::Literal(&rest[..i]));
                    rest = &rest[i..];
                }
                None => {
                    pieces.push(Piece::Literal(rest));
                    rest = "";
                }
            }
        }

        Ok(pieces)
    }

    pub fn as_str(&self) -> &'static str {
        self.source
    }

    /// Parameters declared by placeholders, in template order.
    pub fn params(&self) -> &[ParameterSpec] {
        &self.params
    }

    /// Template with placeholder names and types erased, `/zones/{}/{}` for example.
    ///
    /// Two templates with the same shape match exactly the same set of paths.
    pub fn shape(&self) -> String {
        let mut out = String::new();
        for pieces in &self.segments {
            out.push('/');
            for piece in pieces {
                match piece {
                    Piece::Literal(l) => out.push_str(l),
                    Piece::Param(_) => out.push_str("{}"),
                }
            }
        }

        out
    }

    /// Ordering key used to pick the most specific of several matching templates.
    ///
    /// Templates with more purely literal segments win. Remaining ties go to the template
    /// whose literal segments appear earliest.
    fn specificity(&self) -> (usize, Vec<bool>) {
        let literal: Vec<bool> = self
            .segments
            .iter()
            .map(|pieces| matches!(pieces.as_slice(), [Piece::Literal(_)]))
            .collect();

        (literal.iter().filter(|l| **l).count(), literal)
    }

    /// Match decoded path segments against this template, returning raw placeholder values.
    pub fn captures(&self, segments: &[String]) -> Option<Vec<(&'static str, String)>> {
        if segments.len() != self.segments.len() {
            return None;
        }

        let mut captures = Vec::with_capacity(self.params.len());
        for (pieces, segment) in self.segments.iter().zip(segments) {
            if !match_segment(pieces, segment, &mut captures) {
                return None;
            }
        }

        Some(captures)
    }
}

fn match_segment(pieces: &[Piece], input: &str, captures: &mut Vec<(&'static str, String)>) -> bool {
    let mut rest = input;
    let mut iter = pieces.iter().peekable();

    while let Some(piece) = iter.next() {
        match piece {
            Piece::Literal(lit) => match rest.strip_prefix(lit) {
                Some(r) => rest = r,
                None => return false,
            },
            Piece::Param(name) => {
                let end = match iter.peek() {
                    Some(Piece::Literal(next)) => match rest.find(next) {
                        Some(i) => i,
                        None => return false,
                    },
                    _ => rest.len(),
                };

                if end == 0 {
                    return false;
                }

                captures.push((*name, rest[..end].to_owned()));
                rest = &rest[end..];
            }
        }
    }

    rest.is_empty()
}

/// Split and percent-decode a request path. `None` if any segment is not valid UTF-8.
fn split_path(path: &str) -> Option<Vec<String>> {
    path.strip_prefix('/')
        .unwrap_or(path)
        .split('/')
        .map(|s| percent_decode_str(s).decode_utf8().ok().map(|d| d.into_owned()))
        .collect()
}

/// Decoded `.` and `..` would be collapsed when building the upstream URL.
fn is_dot_segment(raw: &str) -> bool {
    raw == "." || raw == ".."
}

/// Failure to bind request parameters to an upstream operation.
#[derive(Debug, Clone, PartialEq)]
pub enum BindError {
    Missing(&'static str),
    Invalid(&'static str, ParamType, String),
    WrongType(&'static str, ParamType),
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(name) => write!(f, "missing required parameter '{}'", name),
            Self::Invalid(name, kind, raw) => {
                write!(f, "invalid {} value '{}' for parameter '{}'", kind, raw, name)
            }
            Self::WrongType(name, kind) => write!(f, "parameter '{}' is not declared as {}", name, kind),
        }
    }
}

impl error::Error for BindError {}

/// Coerced values of the parameters declared by a route.
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: Vec<(ParamSource, Argument)>,
}

impl Params {
    /// Coerce raw path captures and query pairs according to `specs`.
    ///
    /// Query pairs not declared in `specs` are ignored. Repeated query parameters are kept
    /// in the order supplied.
    pub fn coerce(
        specs: &[ParameterSpec],
        path: Vec<(&'static str, String)>,
        query: &[(String, String)],
    ) -> Result<Self, BindError> {
        let mut values = Vec::with_capacity(specs.len());

        for spec in specs {
            let before = values.len();
            match spec.source {
                ParamSource::Path => {
                    if let Some((_, raw)) = path.iter().find(|(n, _)| *n == spec.name) {
                        if is_dot_segment(raw) {
                            return Err(BindError::Invalid(spec.name, spec.kind, raw.clone()));
                        }
                        values.push((spec.source, Argument::new(spec.name, spec.kind.coerce(spec.name, raw)?)));
                    }
                }
                ParamSource::Query => {
                    for (_, raw) in query.iter().filter(|(n, _)| n == spec.name) {
                        values.push((spec.source, Argument::new(spec.name, spec.kind.coerce(spec.name, raw)?)));
                    }
                }
            }

            if spec.required && values.len() == before {
                return Err(BindError::Missing(spec.name));
            }
        }

        Ok(Params { values })
    }

    /// Distinct placeholder values for every spec, used to check bindings ahead of time.
    fn sample(specs: &[ParameterSpec]) -> Self {
        let values = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| (spec.source, Argument::new(spec.name, spec.kind.sample(i + 1))))
            .collect();

        Params { values }
    }

    fn get(&self, name: &'static str) -> Option<&ParamValue> {
        self.values.iter().find(|(_, a)| a.name == name).map(|(_, a)| &a.value)
    }

    pub fn string(&self, name: &'static str) -> Result<String, BindError> {
        match self.get(name) {
            Some(ParamValue::String(v)) => Ok(v.clone()),
            Some(_) => Err(BindError::WrongType(name, ParamType::String)),
            None => Err(BindError::Missing(name)),
        }
    }

    pub fn integer(&self, name: &'static str) -> Result<i64, BindError> {
        match self.get(name) {
            Some(ParamValue::Integer(v)) => Ok(*v),
            Some(_) => Err(BindError::WrongType(name, ParamType::Integer)),
            None => Err(BindError::Missing(name)),
        }
    }

    pub fn float(&self, name: &'static str) -> Result<f64, BindError> {
        match self.get(name) {
            Some(ParamValue::Float(v)) => Ok(*v),
            Some(_) => Err(BindError::WrongType(name, ParamType::Float)),
            None => Err(BindError::Missing(name)),
        }
    }

    /// All supplied query parameters.
    pub fn query(&self) -> Query {
        self.values
            .iter()
            .filter(|(source, _)| *source == ParamSource::Query)
            .map(|(_, a)| a.clone())
            .collect()
    }
}

/// Typed read of a single coerced parameter.
pub trait FromParam: Sized {
    fn from_param(params: &Params, name: &'static str) -> Result<Self, BindError>;
}

impl FromParam for String {
    fn from_param(params: &Params, name: &'static str) -> Result<Self, BindError> {
        params.string(name)
    }
}

impl FromParam for i64 {
    fn from_param(params: &Params, name: &'static str) -> Result<Self, BindError> {
        params.integer(name)
    }
}

impl FromParam for f64 {
    fn from_param(params: &Params, name: &'static str) -> Result<Self, BindError> {
        params.float(name)
    }
}

/// Rule that turns coerced request parameters into a single upstream operation.
pub type Binding = fn(&Params) -> Result<Operation, BindError>;

/// Unvalidated route declaration. Validated when collected into a `RouteTable`.
#[derive(Clone)]
pub struct RouteDefinition {
    method: Method,
    template: &'static str,
    query: Vec<ParameterSpec>,
    bind: Binding,
}

impl RouteDefinition {
    pub fn new(method: Method, template: &'static str, bind: Binding) -> Self {
        RouteDefinition {
            method,
            template,
            query: Vec::new(),
            bind,
        }
    }

    pub fn get(template: &'static str, bind: Binding) -> Self {
        Self::new(Method::GET, template, bind)
    }

    /// Declare optional query parameters accepted by this route.
    pub fn with_query(mut self, params: &[(&'static str, ParamType)]) -> Self {
        self.query
            .extend(params.iter().map(|(name, kind)| ParameterSpec::query(name, *kind)));
        self
    }
}

impl fmt::Debug for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("method", &self.method)
            .field("template", &self.template)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteTableError {
    Template(&'static str, TemplateError),
    DuplicateParameter(&'static str, &'static str),
    DuplicateRoute(Method, &'static str, &'static str),
    Binding(&'static str, BindError),
}

impl fmt::Display for RouteTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template(t, e) => write!(f, "invalid template {}: {}", t, e),
            Self::DuplicateParameter(t, name) => write!(f, "parameter '{}' declared twice for {}", name, t),
            Self::DuplicateRoute(method, t, existing) => {
                write!(f, "route {} {} conflicts with {} {}", method, t, method, existing)
            }
            Self::Binding(t, e) => write!(f, "invalid binding for {}: {}", t, e),
        }
    }
}

impl error::Error for RouteTableError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Template(_, e) => Some(e),
            Self::Binding(_, e) => Some(e),
            _ => None,
        }
    }
}

/// A validated route.
pub struct Route {
    method: Method,
    template: Template,
    params: Vec<ParameterSpec>,
    bind: Binding,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("template", &self.template.as_str())
            .finish_non_exhaustive()
    }
}

impl Route {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Path parameters followed by query parameters.
    pub fn params(&self) -> &[ParameterSpec] {
        &self.params
    }
}

/// Result of looking up a request in a `RouteTable`.
#[derive(Debug)]
pub enum Resolution<'a> {
    Matched(RouteMatch<'a>),
    MethodNotAllowed,
    NotFound,
}

#[derive(Debug)]
pub struct RouteMatch<'a> {
    route: &'a Route,
    captures: Vec<(&'static str, String)>,
}

impl<'a> RouteMatch<'a> {
    pub fn route(&self) -> &'a Route {
        self.route
    }

    /// Coerce parameters and build the upstream operation for this request.
    pub fn bind(self, query: &[(String, String)]) -> Result<Operation, BindError> {
        let params = Params::coerce(&self.route.params, self.captures, query)?;
        (self.route.bind)(&params)
    }
}

/// Immutable set of routes, keyed by method and template shape.
#[derive(Debug)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Validate route definitions and build a table from them.
    ///
    /// Fails if a template cannot be parsed, if two routes for the same method have the same
    /// template shape, or if a binding refers to a parameter that its route does not declare
    /// (or declares with a different type).
    pub fn new(definitions: Vec<RouteDefinition>) -> Result<Self, RouteTableError> {
        let mut routes: Vec<Route> = Vec::with_capacity(definitions.len());
        let mut shapes = HashSet::new();

        for def in definitions {
            let template = Template::parse(def.template).map_err(|e| RouteTableError::Template(def.template, e))?;

            let mut params = template.params().to_vec();
            for spec in def.query {
                if params.iter().any(|p| p.name == spec.name) {
                    return Err(RouteTableError::DuplicateParameter(def.template, spec.name));
                }
                params.push(spec);
            }

            if !shapes.insert((def.method.clone(), template.shape())) {
                let existing = routes
                    .iter()
                    .find(|r| r.method == def.method && r.template.shape() == template.shape())
                    .map(|r| r.template.as_str())
                    .unwrap_or_default();
                return Err(RouteTableError::DuplicateRoute(def.method, def.template, existing));
            }

            (def.bind)(&Params::sample(&params)).map_err(|e| RouteTableError::Binding(def.template, e))?;

            routes.push(Route {
                method: def.method,
                template,
                params,
                bind: def.bind,
            });
        }

        Ok(RouteTable { routes })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the most specific route matching `method` and `path`.
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        let segments = match split_path(path) {
            Some(s) => s,
            None => return Resolution::NotFound,
        };
        let mut best: Option<RouteMatch<'_>> = None;
        let mut other_method = false;

        for route in &self.routes {
            let captures = match route.template.captures(&segments) {
                Some(c) => c,
                None => continue,
            };

            if &route.method != method {
                other_method = true;
                continue;
            }

            let better = match &best {
                Some(b) => route.template.specificity() > b.route.template.specificity(),
                None => true,
            };

            if better {
                best = Some(RouteMatch { route, captures });
            }
        }

        match best {
            Some(m) => Resolution::Matched(m),
            None if other_method => Resolution::MethodNotAllowed,
            None => Resolution::NotFound,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{BindError, ParamType, Params, ParameterSpec, Resolution, RouteDefinition, RouteTable};
    use super::{RouteTableError, Template, TemplateError};
    use crate::upstream::{Argument, Operation, ParamValue};
    use axum::http::Method;

    fn segments(path: &str) -> Vec<String> {
        super::split_path(path).unwrap()
    }

    #[test]
    fn test_parse_typed_composite() {
        let t = Template::parse("/gridpoints/{wfo}/{x:int},{y:int}/forecast").unwrap();
        assert_eq!(
            vec![
                ParameterSpec::path("wfo", ParamType::String),
                ParameterSpec::path("x", ParamType::Integer),
                ParameterSpec::path("y", ParamType::Integer),
            ],
            t.params()
        );
        assert_eq!("/gridpoints/{}/{},{}/forecast", t.shape());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Some(TemplateError::MissingLeadingSlash), Template::parse("zones").err());
        assert_eq!(Some(TemplateError::EmptySegment), Template::parse("/zones//x").err());
        assert_eq!(Some(TemplateError::UnclosedPlaceholder), Template::parse("/zones/{id").err());
        assert_eq!(Some(TemplateError::UnexpectedBrace), Template::parse("/zones/id}").err());
        assert_eq!(
            Some(TemplateError::UnknownType("uuid".to_owned())),
            Template::parse("/zones/{id:uuid}").err()
        );
        assert_eq!(
            Some(TemplateError::DuplicateName("id".to_owned())),
            Template::parse("/zones/{id}/{id}").err()
        );
        assert_eq!(
            Some(TemplateError::AdjacentPlaceholders("{a}{b}".to_owned())),
            Template::parse("/zones/{a}{b}").err()
        );
        assert_eq!(
            Some(TemplateError::InvalidName("a-b".to_owned())),
            Template::parse("/zones/{a-b}").err()
        );
    }

    #[test]
    fn test_captures_composite() {
        let t = Template::parse("/points/{latitude:float},{longitude:float}").unwrap();
        assert_eq!(
            Some(vec![("latitude", "38.99".to_owned()), ("longitude", "-77.01".to_owned())]),
            t.captures(&segments("/points/38.99,-77.01"))
        );
        assert_eq!(None, t.captures(&segments("/points/38.99")));
        assert_eq!(None, t.captures(&segments("/points/,-77.01")));
        assert_eq!(None, t.captures(&segments("/points/38.99,")));
        assert_eq!(None, t.captures(&segments("/points/38.99,-77.01/radio")));
    }

    #[test]
    fn test_captures_decoded() {
        let t = Template::parse("/stations/{station_id}").unwrap();
        assert_eq!(
            Some(vec![("station_id", "K BOS".to_owned())]),
            t.captures(&segments("/stations/K%20BOS"))
        );
        assert_eq!(None, t.captures(&segments("/stations/")));
    }

    #[test]
    fn test_coerce() {
        let specs = vec![
            ParameterSpec::path("wfo", ParamType::String),
            ParameterSpec::path("x", ParamType::Integer),
            ParameterSpec::query("limit", ParamType::Integer),
        ];
        let path = vec![("wfo", "LWX".to_owned()), ("x", "96".to_owned())];
        let query = vec![
            ("limit".to_owned(), "10".to_owned()),
            ("unknown".to_owned(), "ignored".to_owned()),
        ];

        let params = Params::coerce(&specs, path, &query).unwrap();
        assert_eq!(Ok("LWX".to_owned()), params.string("wfo"));
        assert_eq!(Ok(96), params.integer("x"));
        assert_eq!(vec![Argument::new("limit", 10_i64)], params.query());
        assert_eq!(Err(BindError::WrongType("x", ParamType::Float)), params.float("x"));
        assert_eq!(Err(BindError::Missing("y")), params.integer("y"));
    }

    #[test]
    fn test_coerce_invalid() {
        let specs = vec![ParameterSpec::path("x", ParamType::Integer)];
        let res = Params::coerce(&specs, vec![("x", "abc".to_owned())], &[]);
        assert_eq!(Err(BindError::Invalid("x", ParamType::Integer, "abc".to_owned())), res.map(|_| ()));

        let specs = vec![ParameterSpec::path("lat", ParamType::Float)];
        let res = Params::coerce(&specs, vec![("lat", "NaN".to_owned())], &[]);
        assert!(matches!(res, Err(BindError::Invalid("lat", ParamType::Float, _))));

        let specs = vec![ParameterSpec::query("limit", ParamType::Integer)];
        let res = Params::coerce(&specs, vec![], &[("limit".to_owned(), "ten".to_owned())]);
        assert!(matches!(res, Err(BindError::Invalid("limit", ParamType::Integer, _))));
    }

    #[test]
    fn test_coerce_dot_segments() {
        let specs = vec![ParameterSpec::path("alert_id", ParamType::String)];
        for raw in [".", ".."] {
            let res = Params::coerce(&specs, vec![("alert_id", raw.to_owned())], &[]);
            assert_eq!(
                Err(BindError::Invalid("alert_id", ParamType::String, raw.to_owned())),
                res.map(|_| ())
            );
        }

        let res = Params::coerce(&specs, vec![("alert_id", "...".to_owned())], &[]).unwrap();
        assert_eq!(Ok("...".to_owned()), res.string("alert_id"));

        let specs = vec![ParameterSpec::query("event", ParamType::String)];
        let res = Params::coerce(&specs, vec![], &[("event".to_owned(), "..".to_owned())]).unwrap();
        assert_eq!(vec![Argument::new("event", "..")], res.query());
    }

    #[test]
    fn test_split_path_invalid_utf8() {
        assert_eq!(None, super::split_path("/stations/%FF"));
        assert_eq!(Some(vec!["stations".to_owned(), "é".to_owned()]), super::split_path("/stations/%C3%A9"));
    }

    #[test]
    fn test_coerce_missing_required() {
        let specs = vec![ParameterSpec {
            required: true,
            ..ParameterSpec::query("start", ParamType::String)
        }];
        let res = Params::coerce(&specs, vec![], &[]);
        assert_eq!(Err(BindError::Missing("start")), res.map(|_| ()));
    }

    fn zone_routes() -> Vec<RouteDefinition> {
        vec![
            RouteDefinition::get("/zones", |p| Ok(Operation::ZoneList { query: p.query() })),
            RouteDefinition::get("/zones/{zone_type}", |p| {
                Ok(Operation::ZoneListType {
                    zone_type: p.string("zone_type")?,
                })
            }),
            RouteDefinition::get("/zones/{zone_type}/{zone_id}", |p| {
                Ok(Operation::Zone {
                    zone_type: p.string("zone_type")?,
                    zone_id: p.string("zone_id")?,
                })
            }),
            RouteDefinition::get("/zones/forecast/{zone_id}/observations", |p| {
                Ok(Operation::ZoneObs {
                    zone_id: p.string("zone_id")?,
                })
            }),
            RouteDefinition::get("/zones/{zone_type}/{zone_id}/forecast", |p| {
                Ok(Operation::ZoneForecast {
                    zone_type: p.string("zone_type")?,
                    zone_id: p.string("zone_id")?,
                })
            }),
        ]
    }

    fn resolve_op(table: &RouteTable, path: &str) -> Operation {
        match table.resolve(&Method::GET, path) {
            Resolution::Matched(m) => m.bind(&[]).unwrap(),
            r => panic!("unexpected resolution for {}: {:?}", path, r),
        }
    }

    #[test]
    fn test_resolve_most_specific() {
        let table = RouteTable::new(zone_routes()).unwrap();

        assert_eq!(Operation::ZoneList { query: vec![] }, resolve_op(&table, "/zones"));
        assert_eq!(
            Operation::ZoneListType {
                zone_type: "forecast".to_owned()
            },
            resolve_op(&table, "/zones/forecast")
        );
        assert_eq!(
            Operation::Zone {
                zone_type: "forecast".to_owned(),
                zone_id: "MDZ001".to_owned(),
            },
            resolve_op(&table, "/zones/forecast/MDZ001")
        );
        assert_eq!(
            Operation::ZoneObs {
                zone_id: "MDZ001".to_owned()
            },
            resolve_op(&table, "/zones/forecast/MDZ001/observations")
        );
        assert_eq!(
            Operation::ZoneForecast {
                zone_type: "forecast".to_owned(),
                zone_id: "MDZ001".to_owned(),
            },
            resolve_op(&table, "/zones/forecast/MDZ001/forecast")
        );
    }

    #[test]
    fn test_resolve_not_found_and_method() {
        let table = RouteTable::new(zone_routes()).unwrap();

        assert!(matches!(table.resolve(&Method::GET, "/"), Resolution::NotFound));
        assert!(matches!(table.resolve(&Method::GET, "/zones/"), Resolution::NotFound));
        assert!(matches!(table.resolve(&Method::GET, "/zones/a/b/c/d"), Resolution::NotFound));
        assert!(matches!(table.resolve(&Method::POST, "/zones"), Resolution::MethodNotAllowed));
    }

    #[test]
    fn test_resolve_tie_prefers_earlier_literal() {
        let table = RouteTable::new(vec![
            RouteDefinition::get("/stations/{station_id}/tafs", |p| {
                Ok(Operation::Tafs {
                    station_id: p.string("station_id")?,
                })
            }),
            RouteDefinition::get("/stations/tafs/{station_id}", |p| {
                Ok(Operation::ObsStation {
                    station_id: p.string("station_id")?,
                })
            }),
        ])
        .unwrap();

        assert_eq!(
            Operation::ObsStation {
                station_id: "tafs".to_owned()
            },
            resolve_op(&table, "/stations/tafs/tafs")
        );
    }

    #[test]
    fn test_new_duplicate_shape() {
        let res = RouteTable::new(vec![
            RouteDefinition::get("/zones/{zone_type}", |p| {
                Ok(Operation::ZoneListType {
                    zone_type: p.string("zone_type")?,
                })
            }),
            RouteDefinition::get("/zones/{kind}", |p| {
                Ok(Operation::ZoneListType {
                    zone_type: p.string("kind")?,
                })
            }),
        ]);

        assert_eq!(
            Some(RouteTableError::DuplicateRoute(Method::GET, "/zones/{kind}", "/zones/{zone_type}")),
            res.err()
        );
    }

    #[test]
    fn test_new_undeclared_binding() {
        let res = RouteTable::new(vec![RouteDefinition::get("/zones/{zone_type}", |p| {
            Ok(Operation::ZoneListType {
                zone_type: p.string("type")?,
            })
        })]);

        assert_eq!(
            Some(RouteTableError::Binding("/zones/{zone_type}", BindError::Missing("type"))),
            res.err()
        );
    }

    #[test]
    fn test_new_mistyped_binding() {
        let res = RouteTable::new(vec![RouteDefinition::get("/gridpoints/{wfo}/{x},{y}", |p| {
            Ok(Operation::Gridpoint {
                wfo: p.string("wfo")?,
                x: p.integer("x")?,
                y: p.integer("y")?,
            })
        })]);

        assert_eq!(
            Some(RouteTableError::Binding(
                "/gridpoints/{wfo}/{x},{y}",
                BindError::WrongType("x", ParamType::Integer)
            )),
            res.err()
        );
    }

    #[test]
    fn test_new_duplicate_query_parameter() {
        let res = RouteTable::new(vec![RouteDefinition::get("/zones/{zone_type}", |p| {
            Ok(Operation::ZoneListType {
                zone_type: p.string("zone_type")?,
            })
        })
        .with_query(&[("zone_type", ParamType::String)])]);

        assert_eq!(
            Some(RouteTableError::DuplicateParameter("/zones/{zone_type}", "zone_type")),
            res.err()
        );
    }

    #[test]
    fn test_sample_values_distinct() {
        let specs = vec![
            ParameterSpec::path("a", ParamType::String),
            ParameterSpec::path("b", ParamType::Integer),
            ParameterSpec::path("c", ParamType::Float),
        ];
        let params = Params::sample(&specs);
        assert_eq!(Ok("v1".to_owned()), params.string("a"));
        assert_eq!(Ok(2), params.integer("b"));
        assert_eq!(Ok(3.5), params.float("c"));
        assert_eq!(Some(&ParamValue::Integer(2)), params.get("b"));
    }
}
