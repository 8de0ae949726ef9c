//! Name-keyed uniform interface
//!
//! Shader parameters are set by name, one call per value, through the
//! [`UniformTarget`] trait. [`UniformLayout`] describes where each named
//! value lives inside a WGSL uniform struct, and [`UniformBlock`] is a CPU
//! byte image of such a struct that a GPU program uploads before drawing.
//!
//! Layout rules follow the WGSL uniform address space: vectors of three
//! components align to 16 bytes, array elements are strided to a multiple of
//! 16 bytes, and booleans are stored as `u32`. Scalar arrays are packed into
//! the components of a single `vec4`.

use std::collections::HashMap;
use std::sync::Arc;

use glam::{Mat2, Mat3, Mat4, Vec2, Vec3, Vec4};

/// A value written to a named uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat2(Mat2),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl UniformValue {
    /// Type tag of this value
    pub fn ty(&self) -> UniformType {
        match self {
            UniformValue::Bool(_) => UniformType::Bool,
            UniformValue::Int(_) => UniformType::Int,
            UniformValue::Float(_) => UniformType::Float,
            UniformValue::Vec2(_) => UniformType::Vec2,
            UniformValue::Vec3(_) => UniformType::Vec3,
            UniformValue::Vec4(_) => UniformType::Vec4,
            UniformValue::Mat2(_) => UniformType::Mat2,
            UniformValue::Mat3(_) => UniformType::Mat3,
            UniformValue::Mat4(_) => UniformType::Mat4,
        }
    }

    /// Float payload, if this is a float
    pub fn as_float(&self) -> Option<f32> {
        match self {
            UniformValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer payload, if this is an int
    pub fn as_int(&self) -> Option<i32> {
        match self {
            UniformValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean payload, if this is a bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            UniformValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

/// Anything that accepts uniform writes by name
pub trait UniformTarget {
    /// Write `value` to the uniform called `name`
    fn set_uniform(&mut self, name: &str, value: UniformValue);

    fn set_bool(&mut self, name: &str, value: bool) {
        self.set_uniform(name, UniformValue::Bool(value));
    }

    fn set_int(&mut self, name: &str, value: i32) {
        self.set_uniform(name, UniformValue::Int(value));
    }

    fn set_float(&mut self, name: &str, value: f32) {
        self.set_uniform(name, UniformValue::Float(value));
    }

    fn set_vec2(&mut self, name: &str, value: Vec2) {
        self.set_uniform(name, UniformValue::Vec2(value));
    }

    fn set_vec3(&mut self, name: &str, value: Vec3) {
        self.set_uniform(name, UniformValue::Vec3(value));
    }

    fn set_vec4(&mut self, name: &str, value: Vec4) {
        self.set_uniform(name, UniformValue::Vec4(value));
    }

    fn set_mat2(&mut self, name: &str, value: Mat2) {
        self.set_uniform(name, UniformValue::Mat2(value));
    }

    fn set_mat3(&mut self, name: &str, value: Mat3) {
        self.set_uniform(name, UniformValue::Mat3(value));
    }

    fn set_mat4(&mut self, name: &str, value: Mat4) {
        self.set_uniform(name, UniformValue::Mat4(value));
    }
}

/// Type of a uniform slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Bool,
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl UniformType {
    /// (alignment, size) in the uniform address space
    pub fn align_size(self) -> (u32, u32) {
        match self {
            UniformType::Bool | UniformType::Int | UniformType::Float => (4, 4),
            UniformType::Vec2 => (8, 8),
            UniformType::Vec3 => (16, 12),
            UniformType::Vec4 => (16, 16),
            UniformType::Mat2 => (8, 16),
            UniformType::Mat3 => (16, 48),
            UniformType::Mat4 => (16, 64),
        }
    }
}

/// Location of a single named value inside a uniform block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlot {
    pub offset: u32,
    pub ty: UniformType,
}

fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

/// Byte layout of a WGSL uniform struct, keyed by uniform name
#[derive(Debug, Clone, Default)]
pub struct UniformLayout {
    slots: HashMap<String, UniformSlot>,
    size: u32,
    align: u32,
}

impl UniformLayout {
    /// Start a layout; fields are placed in call order
    pub fn builder() -> UniformLayoutBuilder {
        UniformLayoutBuilder {
            layout: UniformLayout {
                slots: HashMap::new(),
                size: 0,
                align: 16,
            },
        }
    }

    /// Slot for `name`, including indexed names like `light_colors[2]`
    pub fn slot(&self, name: &str) -> Option<UniformSlot> {
        self.slots.get(name).copied()
    }

    /// Struct size rounded to its alignment
    pub fn size(&self) -> u32 {
        align_to(self.size.max(1), self.align)
    }

    /// Number of addressable names
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if the layout has no fields
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Builder for [`UniformLayout`]
pub struct UniformLayoutBuilder {
    layout: UniformLayout,
}

impl UniformLayoutBuilder {
    fn place(&mut self, align: u32, size: u32) -> u32 {
        let offset = align_to(self.layout.size, align);
        self.layout.size = offset + size;
        offset
    }

    /// A single value
    pub fn field(mut self, name: &str, ty: UniformType) -> Self {
        let (align, size) = ty.align_size();
        let offset = self.place(align, size);
        self.layout
            .slots
            .insert(name.to_string(), UniformSlot { offset, ty });
        self
    }

    /// A fixed-size array; element `i` is addressed as `name[i]`
    pub fn array(mut self, name: &str, ty: UniformType, count: u32) -> Self {
        let (align, size) = ty.align_size();
        let align = align_to(align, 16);
        let stride = align_to(size, align);
        let base = self.place(align, stride * count);
        for i in 0..count {
            self.layout.slots.insert(
                format!("{name}[{i}]"),
                UniformSlot {
                    offset: base + i * stride,
                    ty,
                },
            );
        }
        self
    }

    /// Up to four scalars packed into one `vec4`; element `i` is `name[i]`
    pub fn packed(mut self, name: &str, ty: UniformType, count: u32) -> Self {
        debug_assert!(matches!(
            ty,
            UniformType::Bool | UniformType::Int | UniformType::Float
        ));
        let count = count.min(4);
        let base = self.place(16, 16);
        for i in 0..count {
            self.layout.slots.insert(
                format!("{name}[{i}]"),
                UniformSlot {
                    offset: base + i * 4,
                    ty,
                },
            );
        }
        self
    }

    /// Finish the layout
    pub fn build(self) -> UniformLayout {
        self.layout
    }
}

/// CPU image of a uniform struct, written through [`UniformTarget`]
#[derive(Debug, Clone)]
pub struct UniformBlock {
    layout: Arc<UniformLayout>,
    data: Vec<u8>,
}

impl UniformBlock {
    /// Zero-initialized block for `layout`
    pub fn new(layout: Arc<UniformLayout>) -> Self {
        let data = vec![0; layout.size() as usize];
        Self { layout, data }
    }

    /// Layout backing this block
    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    /// Raw bytes ready for upload
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Reset all values to zero
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) {
        let start = offset as usize;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
    }

    /// Read back a float previously written at `name`
    pub fn read_float(&self, name: &str) -> Option<f32> {
        let slot = self.layout.slot(name)?;
        let start = slot.offset as usize;
        let bytes: [u8; 4] = self.data[start..start + 4].try_into().ok()?;
        Some(f32::from_ne_bytes(bytes))
    }

    /// Read back an int (or bool as 0/1) previously written at `name`
    pub fn read_int(&self, name: &str) -> Option<i32> {
        let slot = self.layout.slot(name)?;
        let start = slot.offset as usize;
        let bytes: [u8; 4] = self.data[start..start + 4].try_into().ok()?;
        Some(i32::from_ne_bytes(bytes))
    }
}

impl UniformTarget for UniformBlock {
    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        let Some(slot) = self.layout.slot(name) else {
            tracing::trace!("Uniform '{}' not present in program, ignored", name);
            return;
        };
        if slot.ty != value.ty() {
            tracing::warn!(
                "Uniform '{}' expects {:?}, got {:?}",
                name,
                slot.ty,
                value.ty()
            );
            return;
        }
        match value {
            UniformValue::Bool(v) => self.write(slot.offset, bytemuck::bytes_of(&u32::from(v))),
            UniformValue::Int(v) => self.write(slot.offset, bytemuck::bytes_of(&v)),
            UniformValue::Float(v) => self.write(slot.offset, bytemuck::bytes_of(&v)),
            UniformValue::Vec2(v) => self.write(slot.offset, bytemuck::cast_slice(&v.to_array())),
            UniformValue::Vec3(v) => self.write(slot.offset, bytemuck::cast_slice(&v.to_array())),
            UniformValue::Vec4(v) => self.write(slot.offset, bytemuck::cast_slice(&v.to_array())),
            UniformValue::Mat2(v) => {
                self.write(slot.offset, bytemuck::cast_slice(&v.to_cols_array()));
            }
            UniformValue::Mat3(v) => {
                // Columns are vec3 padded to 16 bytes
                for (i, col) in v.to_cols_array_2d().iter().enumerate() {
                    self.write(slot.offset + i as u32 * 16, bytemuck::cast_slice(col));
                }
            }
            UniformValue::Mat4(v) => {
                self.write(slot.offset, bytemuck::cast_slice(&v.to_cols_array()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_layout() -> UniformLayout {
        UniformLayout::builder()
            .field("model", UniformType::Mat4)
            .array("positions", UniformType::Vec3, 2)
            .packed("active", UniformType::Bool, 2)
            .field("eye", UniformType::Vec3)
            .field("exponent", UniformType::Int)
            .field("normal_matrix", UniformType::Mat3)
            .field("gamma", UniformType::Float)
            .build()
    }

    #[test]
    fn test_layout_offsets() {
        let layout = sample_layout();
        assert_eq!(layout.slot("model").map(|s| s.offset), Some(0));
        assert_eq!(layout.slot("positions[0]").map(|s| s.offset), Some(64));
        assert_eq!(layout.slot("positions[1]").map(|s| s.offset), Some(80));
        assert_eq!(layout.slot("active[0]").map(|s| s.offset), Some(96));
        assert_eq!(layout.slot("active[1]").map(|s| s.offset), Some(100));
        assert_eq!(layout.slot("eye").map(|s| s.offset), Some(112));
        // Scalar fits in the vec3 tail
        assert_eq!(layout.slot("exponent").map(|s| s.offset), Some(124));
        assert_eq!(layout.slot("normal_matrix").map(|s| s.offset), Some(128));
        assert_eq!(layout.slot("gamma").map(|s| s.offset), Some(176));
        assert_eq!(layout.size(), 192);
        assert!(layout.slot("positions[2]").is_none());
    }

    #[test]
    fn test_block_writes_and_reads() {
        let mut block = UniformBlock::new(Arc::new(sample_layout()));
        block.set_float("gamma", 2.2);
        block.set_int("exponent", 64);
        block.set_bool("active[1]", true);
        assert_eq!(block.read_float("gamma"), Some(2.2));
        assert_eq!(block.read_int("exponent"), Some(64));
        assert_eq!(block.read_int("active[1]"), Some(1));
        assert_eq!(block.read_int("active[0]"), Some(0));
    }

    #[test]
    fn test_unknown_and_mismatched_writes_are_ignored() {
        let mut block = UniformBlock::new(Arc::new(sample_layout()));
        block.set_float("missing", 1.0);
        block.set_int("gamma", 3);
        assert!(block.bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_mat3_columns_are_padded() {
        let mut block = UniformBlock::new(Arc::new(sample_layout()));
        block.set_mat3("normal_matrix", Mat3::from_diagonal(Vec3::new(1.0, 2.0, 3.0)));
        let float_at =
            |offset: usize| f32::from_ne_bytes(block.bytes()[offset..offset + 4].try_into().unwrap());
        assert_eq!(float_at(128), 1.0);
        assert_eq!(float_at(140), 0.0);
        assert_eq!(float_at(148), 2.0);
        assert_eq!(float_at(168), 3.0);
    }
}
