//! JSON wire form of the scene.
//!
//! Objects are written as flat, canvas-library style records. Only the fields
//! listed on [`ObjectRecord`] are persisted; interaction state such as
//! selectability never reaches the wire.

use crate::shapes::{
    CompositeMode, FreehandPath, Geometry, ImageSource, ObjectId, ObjectKind, ObjectStyle, Rgba,
    SceneObject, Shadow, StickyColor, StickyNote, TextAlign, TextMeta, DEFAULT_FONT_FAMILY,
    DEFAULT_FONT_SIZE,
};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SCENE_FORMAT_VERSION: u32 = 1;

/// The `type` discriminator of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Image,
    Rect,
    Circle,
    Path,
    #[serde(alias = "text", alias = "i-text")]
    Textbox,
    Group,
    #[serde(other)]
    Unknown,
}

fn one() -> f64 {
    1.0
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A single serialized object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
    #[serde(rename = "type")]
    pub kind: RecordType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub angle: f64,
    #[serde(default = "one")]
    pub scale_x: f64,
    #[serde(default = "one")]
    pub scale_y: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Rgba>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Rgba>,
    #[serde(default)]
    pub stroke_width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Shadow>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub lock_scaling_x: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub lock_scaling_y: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub lock_rotation: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_composite_operation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<ObjectRecord>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_text_object: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticky_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Rgba>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_sticky_note: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

impl ObjectRecord {
    fn blank(kind: RecordType) -> Self {
        Self {
            kind,
            id: None,
            left: 0.0,
            top: 0.0,
            width: 0.0,
            height: 0.0,
            angle: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            fill: None,
            stroke: None,
            stroke_width: 0.0,
            shadow: None,
            lock_scaling_x: false,
            lock_scaling_y: false,
            lock_rotation: false,
            src: None,
            radius: None,
            points: None,
            global_composite_operation: None,
            font_size: None,
            font_family: None,
            text_align: None,
            objects: None,
            name: None,
            is_text_object: None,
            text: None,
            sticky_color: None,
            background_color: None,
            is_sticky_note: None,
            group_id: None,
        }
    }

    /// Serialize one object (and its children) into a record.
    pub fn from_object(object: &SceneObject) -> Self {
        let kind = match &object.kind {
            ObjectKind::Image(_) => RecordType::Image,
            ObjectKind::Rectangle => RecordType::Rect,
            ObjectKind::Circle { .. } => RecordType::Circle,
            ObjectKind::FreehandPath(_) => RecordType::Path,
            ObjectKind::TextBox(_) => RecordType::Textbox,
            ObjectKind::StickyNote(_) | ObjectKind::Group { .. } => RecordType::Group,
        };

        let geometry = &object.geometry;
        let mut record = Self::blank(kind);
        record.id = Some(object.id().to_string());
        record.left = geometry.position.x;
        record.top = geometry.position.y;
        record.width = geometry.width;
        record.height = geometry.height;
        record.angle = geometry.rotation;
        record.scale_x = geometry.scale_x;
        record.scale_y = geometry.scale_y;
        record.fill = object.style.fill;
        record.stroke = object.style.stroke;
        record.stroke_width = object.style.stroke_width;
        record.shadow = object.style.shadow;
        record.lock_scaling_x = object.flags.lock_scaling;
        record.lock_scaling_y = object.flags.lock_scaling;
        record.lock_rotation = object.flags.lock_rotation;
        record.name = object.name.clone();

        let parent_id = object.id().to_string();
        let child_records = |children: &[SceneObject]| {
            children
                .iter()
                .map(|child| {
                    let mut rec = ObjectRecord::from_object(child);
                    rec.group_id = Some(parent_id.clone());
                    rec
                })
                .collect::<Vec<_>>()
        };

        match &object.kind {
            ObjectKind::Image(source) => record.src = Some(source.src.clone()),
            ObjectKind::Rectangle => {}
            ObjectKind::Circle { radius } => record.radius = Some(*radius),
            ObjectKind::FreehandPath(path) => {
                record.points = Some(path.points.clone());
                record.global_composite_operation = Some(path.composite.as_str().to_string());
            }
            ObjectKind::TextBox(meta) => {
                record.is_text_object = Some(true);
                record.text = Some(meta.text.clone());
                record.font_size = Some(meta.font_size);
                record.font_family = Some(meta.font_family.clone());
                record.text_align = Some(meta.alignment);
            }
            ObjectKind::StickyNote(note) => {
                record.is_sticky_note = Some(true);
                record.sticky_color = Some(note.color.name().to_string());
                record.background_color = note.background().and_then(|bg| bg.style.fill);
                record.objects = Some(child_records(note.children()));
            }
            ObjectKind::Group { children } => {
                // Tagged so loading never re-derives it as a sticky note.
                record.is_sticky_note = Some(false);
                record.objects = Some(child_records(children));
            }
        }
        record
    }
}

/// Top-level persisted scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub objects: Vec<ObjectRecord>,
}

impl SceneDocument {
    pub fn from_objects(objects: &[SceneObject]) -> Self {
        Self {
            version: SCENE_FORMAT_VERSION,
            objects: objects.iter().map(ObjectRecord::from_object).collect(),
        }
    }
}

/// What happened while turning records back into objects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// The document could not be parsed at all.
    pub malformed: bool,
    /// Records dropped because their type or payload was not understood.
    pub skipped: usize,
    /// Groups re-derived as sticky notes.
    pub sticky_notes: usize,
    pub warnings: Vec<String>,
}

impl LoadReport {
    fn warn(&mut self, message: String) {
        log::warn!("{message}");
        self.warnings.push(message);
    }
}

/// Serialize the objects to the persisted JSON form.
pub fn encode_scene(objects: &[SceneObject]) -> serde_json::Result<String> {
    serde_json::to_string(&SceneDocument::from_objects(objects))
}

/// Strictly parse a scene. Any malformed record fails the whole parse.
pub fn decode_scene_strict(json: &str) -> serde_json::Result<Vec<SceneObject>> {
    let document: SceneDocument = serde_json::from_str(json)?;
    let mut report = LoadReport::default();
    Ok(objects_from_records(document.objects, &mut report))
}

#[derive(Deserialize)]
struct LooseScene {
    #[serde(default)]
    objects: Vec<serde_json::Value>,
}

/// Parse a stored scene, dropping whatever cannot be understood.
///
/// An empty string is a fresh document. Unparseable JSON yields no objects
/// and a report marked `malformed`.
pub fn decode_scene_lenient(json: &str) -> (Vec<SceneObject>, LoadReport) {
    let mut report = LoadReport::default();
    if json.trim().is_empty() {
        return (Vec::new(), report);
    }

    let loose: LooseScene = match serde_json::from_str(json) {
        Ok(loose) => loose,
        Err(e) => {
            report.malformed = true;
            report.warn(format!("Scene JSON is malformed, starting empty: {e}"));
            return (Vec::new(), report);
        }
    };

    let mut records = Vec::with_capacity(loose.objects.len());
    for value in loose.objects {
        match serde_json::from_value::<ObjectRecord>(value) {
            Ok(record) => records.push(record),
            Err(e) => {
                report.skipped += 1;
                report.warn(format!("Skipping unreadable object record: {e}"));
            }
        }
    }

    let objects = objects_from_records(records, &mut report);
    (objects, report)
}

pub(crate) fn objects_from_records(records: Vec<ObjectRecord>, report: &mut LoadReport) -> Vec<SceneObject> {
    records
        .into_iter()
        .filter_map(|record| object_from_record(record, report))
        .collect()
}

fn parse_id(id: Option<&str>) -> ObjectId {
    id.and_then(|s| Uuid::parse_str(s).ok()).unwrap_or_else(Uuid::new_v4)
}

fn object_from_record(record: ObjectRecord, report: &mut LoadReport) -> Option<SceneObject> {
    let geometry = Geometry {
        position: Point::new(record.left, record.top),
        width: record.width,
        height: record.height,
        rotation: record.angle,
        scale_x: record.scale_x,
        scale_y: record.scale_y,
    };

    let kind = match record.kind {
        RecordType::Image => match &record.src {
            Some(src) => ObjectKind::Image(ImageSource::new(src.clone())),
            None => {
                report.skipped += 1;
                report.warn("Skipping image record without a source".to_string());
                return None;
            }
        },
        RecordType::Rect => ObjectKind::Rectangle,
        RecordType::Circle => ObjectKind::Circle {
            radius: record.radius.unwrap_or(record.width / 2.0),
        },
        RecordType::Path => {
            let points = record.points.clone().unwrap_or_default();
            if points.is_empty() {
                report.skipped += 1;
                report.warn("Skipping path record without points".to_string());
                return None;
            }
            let composite = record
                .global_composite_operation
                .as_deref()
                .map(CompositeMode::parse)
                .unwrap_or_default();
            ObjectKind::FreehandPath(FreehandPath::new(points).with_composite(composite))
        }
        RecordType::Textbox => ObjectKind::TextBox(TextMeta {
            text: record.text.clone().unwrap_or_default(),
            font_size: record.font_size.unwrap_or(DEFAULT_FONT_SIZE),
            font_family: record
                .font_family
                .clone()
                .unwrap_or_else(|| DEFAULT_FONT_FAMILY.to_string()),
            alignment: record.text_align.unwrap_or_default(),
        }),
        RecordType::Group => {
            let children = objects_from_records(record.objects.clone().unwrap_or_default(), report);
            group_kind(&record, children, report)
        }
        RecordType::Unknown => {
            report.skipped += 1;
            report.warn(format!(
                "Skipping object {} of unsupported type",
                record.id.as_deref().unwrap_or("<no id>")
            ));
            return None;
        }
    };

    let mut object = SceneObject::new(kind, geometry).with_id(parse_id(record.id.as_deref()));
    object.name = record.name;
    object.style = ObjectStyle {
        fill: record.fill,
        stroke: record.stroke,
        stroke_width: record.stroke_width,
        shadow: record.shadow,
    };
    object.flags.lock_scaling = record.lock_scaling_x || record.lock_scaling_y;
    object.flags.lock_rotation = record.lock_rotation;
    object.refresh_geometry();
    Some(object)
}

/// Decide whether a group record is a sticky note.
fn group_kind(record: &ObjectRecord, children: Vec<SceneObject>, report: &mut LoadReport) -> ObjectKind {
    // Structural recognition only applies to records written without the tag.
    let sticky = match record.is_sticky_note {
        Some(tagged) => tagged,
        None => StickyNote::is_well_formed(&children),
    };
    if !sticky {
        return ObjectKind::Group { children };
    }

    let color = record
        .sticky_color
        .as_deref()
        .and_then(StickyColor::from_name)
        .or_else(|| record.background_color.and_then(StickyColor::from_fill))
        .or_else(|| {
            children
                .iter()
                .find(|c| matches!(c.kind, ObjectKind::Rectangle))
                .and_then(|bg| bg.style.fill)
                .and_then(StickyColor::from_fill)
        })
        .unwrap_or_default();

    if !StickyNote::is_well_formed(&children) {
        report.warn(format!(
            "Sticky note {} has {} children, loading as a plain group",
            record.id.as_deref().unwrap_or("<no id>"),
            children.len()
        ));
        return ObjectKind::Group { children };
    }

    match StickyNote::from_children(children, color) {
        Some(note) => {
            report.sticky_notes += 1;
            ObjectKind::StickyNote(note)
        }
        None => ObjectKind::Group { children: Vec::new() },
    }
}
