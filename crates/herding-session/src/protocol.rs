//! Envelope classification and payload decoding.
//!
//! Inbound envelopes are `<message type="...">` documents carrying exactly
//! one nested node whose name depends on the type:
//!
//! | type             | nested node   | handler call          |
//! |------------------|---------------|-----------------------|
//! | `request-action` | `perception`  | answered with action  |
//! | `sim-start`      | `simulation`  | not answered          |
//! | `sim-end`        | `sim-result`  | not answered          |
//!
//! Envelopes of any other type are ignored.

use std::fmt::Display;
use std::str::FromStr;

use herding_types::{Action, CellContent, CellPercept, Perception, SimEnd, SimStart};

use crate::codec::Element;
use crate::error::SessionError;

/// Name of the root element of every envelope.
const ROOT: &str = "message";

/// The three envelope kinds the session dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Simulator asks for this step's action.
    RequestAction,
    /// A match begins.
    SimStart,
    /// A match ended.
    SimEnd,
}

impl MessageKind {
    /// The `type` attribute value naming this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RequestAction => "request-action",
            Self::SimStart => "sim-start",
            Self::SimEnd => "sim-end",
        }
    }

    /// Name of the nested node this kind carries.
    pub const fn payload_node(self) -> &'static str {
        match self {
            Self::RequestAction => "perception",
            Self::SimStart => "simulation",
            Self::SimEnd => "sim-result",
        }
    }

    /// Classify a `type` attribute value; `None` for types the session
    /// does not dispatch.
    pub fn from_type(value: &str) -> Option<Self> {
        [Self::RequestAction, Self::SimStart, Self::SimEnd]
            .into_iter()
            .find(|kind| kind.as_str() == value)
    }
}

/// A decoded inbound envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Perception to answer before `deadline`.
    RequestAction {
        /// The perception snapshot.
        perception: Perception,
        /// Simulator time the envelope was sent.
        timestamp: i64,
        /// Simulator time after which replies are discarded.
        deadline: i64,
    },
    /// Match parameters.
    SimStart {
        /// The parameters.
        start: SimStart,
        /// Simulator time the envelope was sent.
        timestamp: i64,
    },
    /// Match result.
    SimEnd {
        /// The result.
        end: SimEnd,
        /// Simulator time the envelope was sent.
        timestamp: i64,
    },
}

impl Inbound {
    /// Which kind of envelope this was.
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::RequestAction { .. } => MessageKind::RequestAction,
            Self::SimStart { .. } => MessageKind::SimStart,
            Self::SimEnd { .. } => MessageKind::SimEnd,
        }
    }
}

/// Decode one inbound frame.
///
/// Returns `Ok(None)` for well-formed envelopes of a type the session does
/// not dispatch.
///
/// # Errors
///
/// Returns [`SessionError::Malformed`] if the frame is not UTF-8, not XML,
/// not a `message` envelope, lacks exactly one payload node, or carries
/// unparsable attributes.
pub fn decode_inbound(frame: &[u8]) -> Result<Option<Inbound>, SessionError> {
    let text = std::str::from_utf8(frame)
        .map_err(|e| SessionError::Malformed(format!("frame is not UTF-8: {e}")))?;
    let root = Element::parse(text)?;
    classify(&root)
}

/// Classify a parsed envelope and decode its payload node.
///
/// # Errors
///
/// See [`decode_inbound`].
pub fn classify(root: &Element) -> Result<Option<Inbound>, SessionError> {
    if !root.name.eq_ignore_ascii_case(ROOT) {
        return Err(SessionError::Malformed(format!(
            "unexpected root element <{}>",
            root.name
        )));
    }
    let Some(kind) = root.attr("type").and_then(MessageKind::from_type) else {
        return Ok(None);
    };

    let mut nodes = root.children_named(kind.payload_node());
    let node = match (nodes.next(), nodes.next()) {
        (Some(node), None) => node,
        (None, _) => {
            return Err(SessionError::Malformed(format!(
                "{} envelope has no <{}> node",
                kind.as_str(),
                kind.payload_node()
            )));
        }
        (Some(_), Some(_)) => {
            return Err(SessionError::Malformed(format!(
                "{} envelope has more than one <{}> node",
                kind.as_str(),
                kind.payload_node()
            )));
        }
    };

    let timestamp: i64 = match root.attr("timestamp") {
        Some(_) => required(root, "timestamp")?,
        None => required(node, "timestamp")?,
    };

    let inbound = match kind {
        MessageKind::RequestAction => Inbound::RequestAction {
            perception: decode_perception(node)?,
            timestamp,
            deadline: required(node, "deadline")?,
        },
        MessageKind::SimStart => Inbound::SimStart {
            start: decode_sim_start(node)?,
            timestamp,
        },
        MessageKind::SimEnd => Inbound::SimEnd {
            end: SimEnd {
                attributes: node.attributes.clone(),
            },
            timestamp,
        },
    };
    Ok(Some(inbound))
}

/// Decode a `<perception>` node.
///
/// # Errors
///
/// Returns [`SessionError::Malformed`] if a required attribute is missing or
/// unparsable.
pub fn decode_perception(node: &Element) -> Result<Perception, SessionError> {
    let cells = node
        .children_named("cell")
        .map(decode_cell)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Perception {
        id: node.attr("id").unwrap_or_default().to_owned(),
        position: herding_types::Position::new(required(node, "posx")?, required(node, "posy")?),
        step: required(node, "step")?,
        cows_in_corral: optional(node, "cowsInCorral")?.unwrap_or(0),
        cells,
    })
}

fn decode_cell(cell: &Element) -> Result<CellPercept, SessionError> {
    let mut contents = Vec::with_capacity(cell.children.len());
    for child in &cell.children {
        let content = match child.name.as_str() {
            "agent" => CellContent::Agent,
            "obstacle" => CellContent::Obstacle,
            "cow" => CellContent::Cow {
                id: optional(child, "ID")?.unwrap_or(-1),
            },
            "corral" => CellContent::Corral,
            "switch" => CellContent::Switch,
            "fence" => CellContent::Fence {
                open: optional(child, "open")?.unwrap_or(false),
            },
            "empty" => CellContent::Empty,
            _ => continue,
        };
        contents.push(content);
    }
    Ok(CellPercept::new(
        required(cell, "x")?,
        required(cell, "y")?,
        contents,
    ))
}

fn decode_sim_start(node: &Element) -> Result<SimStart, SessionError> {
    Ok(SimStart {
        grid_width: required(node, "gsizex")?,
        grid_height: required(node, "gsizey")?,
        line_of_sight: required(node, "lineOfSight")?,
    })
}

/// The authentication request envelope.
pub fn auth_request(username: &str, password: &str) -> Element {
    Element::new(ROOT).with_attr("type", "auth-request").with_child(
        Element::new("authentication")
            .with_attr("username", username)
            .with_attr("password", password),
    )
}

/// Check an authentication response frame.
///
/// # Errors
///
/// Returns [`SessionError::Auth`] if the frame is not an `auth-response`
/// whose `authentication` node reports `result="ok"`.
pub fn check_auth_response(frame: &[u8]) -> Result<(), SessionError> {
    let text = std::str::from_utf8(frame)
        .map_err(|e| SessionError::Auth(format!("response is not UTF-8: {e}")))?;
    let root = Element::parse(text).map_err(|e| SessionError::Auth(e.to_string()))?;
    if !root
        .attr("type")
        .is_some_and(|t| t.eq_ignore_ascii_case("auth-response"))
    {
        return Err(SessionError::Auth(format!(
            "expected auth-response, got {:?}",
            root.attr("type")
        )));
    }
    let result = root
        .children_named("authentication")
        .next()
        .and_then(|node| node.attr("result"))
        .ok_or_else(|| SessionError::Auth("response carries no result".to_owned()))?;
    if result.eq_ignore_ascii_case("ok") {
        Ok(())
    } else {
        Err(SessionError::Auth(format!("simulator answered {result:?}")))
    }
}

/// The action reply envelope for the perception `perception_id`.
pub fn action_reply(perception_id: &str, action: Action) -> Element {
    Element::new(ROOT).with_attr("type", "action").with_child(
        Element::new("action")
            .with_attr("id", perception_id)
            .with_attr("type", action.as_str()),
    )
}

fn required<T>(element: &Element, key: &str) -> Result<T, SessionError>
where
    T: FromStr,
    T::Err: Display,
{
    optional(element, key)?.ok_or_else(|| {
        SessionError::Malformed(format!("<{}> is missing attribute {key}", element.name))
    })
}

fn optional<T>(element: &Element, key: &str) -> Result<Option<T>, SessionError>
where
    T: FromStr,
    T::Err: Display,
{
    element
        .attr(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| {
                SessionError::Malformed(format!(
                    "<{}> attribute {key}={raw:?} is invalid: {e}",
                    element.name
                ))
            })
        })
        .transpose()
}
