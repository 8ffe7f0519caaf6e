//! Well-known animated property names.

/// Prefix of material property curves (`material._Color.r`).
pub const MATERIAL_PROPERTY_PREFIX: &str = "material.";

/// Prefix of material-reference curves (`m_Materials.Array.data[N]`).
pub const MATERIAL_SLOT_PREFIX: &str = "m_Materials.";

/// Prefix of blend shape weight curves (`blendShape.Name`).
pub const BLEND_SHAPE_PREFIX: &str = "blendShape.";

/// Whether a property animates a material rather than the renderer itself.
pub fn is_material_property(property: &str) -> bool {
    property.starts_with(MATERIAL_PROPERTY_PREFIX) || property.starts_with(MATERIAL_SLOT_PREFIX)
}

/// Slot index of a material-reference property.
pub fn parse_material_slot(property: &str) -> Option<usize> {
    let rest = property.strip_prefix(MATERIAL_SLOT_PREFIX)?;
    let start = rest.find('[')? + 1;
    let end = rest[start..].find(']')? + start;
    rest[start..end].parse().ok()
}

/// Property name swapping material slot `slot`.
pub fn material_slot_property(slot: usize) -> String {
    format!("{MATERIAL_SLOT_PREFIX}Array.data[{slot}]")
}

/// Blend shape named by a weight property.
pub fn blend_shape_name(property: &str) -> Option<&str> {
    property.strip_prefix(BLEND_SHAPE_PREFIX)
}
