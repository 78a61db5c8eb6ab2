//! Named, typed attribute arrays attached to a grid block.
//!
//! A [`FieldArray`] stores `tuples * components` scalars contiguously; tuple
//! `t` occupies `values[t * c .. (t + 1) * c]`. [`FieldData`] is an ordered
//! collection of arrays with unique names, one per point- or cell-associated
//! attribute.

use crate::amr_error::AmrError;
use num_traits::Zero;

/// Scalar type tag for field arrays.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScalarType {
    /// 64-bit float.
    F64,
    /// 32-bit float.
    F32,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
    /// 32-bit unsigned integer.
    U32,
    /// 64-bit unsigned integer.
    U64,
}

impl ScalarType {
    /// Returns a stable string label for the scalar type.
    pub fn as_str(self) -> &'static str {
        match self {
            ScalarType::F64 => "f64",
            ScalarType::F32 => "f32",
            ScalarType::I32 => "i32",
            ScalarType::I64 => "i64",
            ScalarType::U32 => "u32",
            ScalarType::U64 => "u64",
        }
    }
}

/// Typed value storage of a [`FieldArray`].
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayValues {
    /// `f64` values.
    F64(Vec<f64>),
    /// `f32` values.
    F32(Vec<f32>),
    /// `i32` values.
    I32(Vec<i32>),
    /// `i64` values.
    I64(Vec<i64>),
    /// `u32` values.
    U32(Vec<u32>),
    /// `u64` values.
    U64(Vec<u64>),
}

impl ArrayValues {
    /// Scalar type tag of the stored values.
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            ArrayValues::F64(_) => ScalarType::F64,
            ArrayValues::F32(_) => ScalarType::F32,
            ArrayValues::I32(_) => ScalarType::I32,
            ArrayValues::I64(_) => ScalarType::I64,
            ArrayValues::U32(_) => ScalarType::U32,
            ArrayValues::U64(_) => ScalarType::U64,
        }
    }

    /// Length of the flat buffer.
    pub fn len(&self) -> usize {
        match self {
            ArrayValues::F64(v) => v.len(),
            ArrayValues::F32(v) => v.len(),
            ArrayValues::I32(v) => v.len(),
            ArrayValues::I64(v) => v.len(),
            ArrayValues::U32(v) => v.len(),
            ArrayValues::U64(v) => v.len(),
        }
    }

    /// True if the buffer holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Zero-filled storage of the same scalar type.
    fn zeroed_like(&self, len: usize) -> ArrayValues {
        match self {
            ArrayValues::F64(_) => ArrayValues::F64(zeroed(len)),
            ArrayValues::F32(_) => ArrayValues::F32(zeroed(len)),
            ArrayValues::I32(_) => ArrayValues::I32(zeroed(len)),
            ArrayValues::I64(_) => ArrayValues::I64(zeroed(len)),
            ArrayValues::U32(_) => ArrayValues::U32(zeroed(len)),
            ArrayValues::U64(_) => ArrayValues::U64(zeroed(len)),
        }
    }
}

fn zeroed<T: Zero + Clone>(len: usize) -> Vec<T> {
    vec![T::zero(); len]
}

/// Maps a Rust scalar onto its [`ArrayValues`] variant.
pub trait FieldScalar: Copy + Sized + 'static {
    /// Tag of the matching [`ArrayValues`] variant.
    const SCALAR_TYPE: ScalarType;

    /// Moves `values` into their variant.
    fn wrap(values: Vec<Self>) -> ArrayValues;
    /// Borrows the values if the variant matches.
    fn unwrap(values: &ArrayValues) -> Option<&[Self]>;
}

macro_rules! impl_field_scalar {
    ($t:ty, $variant:ident) => {
        impl FieldScalar for $t {
            const SCALAR_TYPE: ScalarType = ScalarType::$variant;

            fn wrap(values: Vec<Self>) -> ArrayValues {
                ArrayValues::$variant(values)
            }

            fn unwrap(values: &ArrayValues) -> Option<&[Self]> {
                if let ArrayValues::$variant(v) = values {
                    Some(v)
                } else {
                    None
                }
            }
        }
    };
}

impl_field_scalar!(f64, F64);
impl_field_scalar!(f32, F32);
impl_field_scalar!(i32, I32);
impl_field_scalar!(i64, I64);
impl_field_scalar!(u32, U32);
impl_field_scalar!(u64, U64);

/// One named attribute array.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldArray {
    name: String,
    components: usize,
    values: ArrayValues,
}

impl FieldArray {
    /// Wraps `values` as an array of `components`-wide tuples.
    pub fn new<T: FieldScalar>(
        name: impl Into<String>,
        components: usize,
        values: Vec<T>,
    ) -> Result<Self, AmrError> {
        Self::from_values(name, components, T::wrap(values))
    }

    /// Like [`new`](Self::new) for already wrapped values.
    pub fn from_values(
        name: impl Into<String>,
        components: usize,
        values: ArrayValues,
    ) -> Result<Self, AmrError> {
        let name = name.into();
        if components == 0 {
            return Err(AmrError::FieldArrayMismatch {
                name,
                reason: "component count must be positive".into(),
            });
        }
        if values.len() % components != 0 {
            return Err(AmrError::FieldArrayMismatch {
                name,
                reason: format!(
                    "{} values do not split into {components}-component tuples",
                    values.len()
                ),
            });
        }
        Ok(Self {
            name,
            components,
            values,
        })
    }

    /// Array name, unique within its [`FieldData`].
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Values per tuple.
    #[inline]
    pub fn components(&self) -> usize {
        self.components
    }

    /// Scalar type of the values.
    #[inline]
    pub fn scalar_type(&self) -> ScalarType {
        self.values.scalar_type()
    }

    /// Number of tuples.
    #[inline]
    pub fn tuples(&self) -> usize {
        self.values.len() / self.components
    }

    /// Untyped storage.
    #[inline]
    pub fn raw(&self) -> &ArrayValues {
        &self.values
    }

    /// Typed view of the flat buffer, `None` on a type mismatch.
    pub fn values<T: FieldScalar>(&self) -> Option<&[T]> {
        T::unwrap(&self.values)
    }

    /// Typed view of tuple `index`.
    pub fn tuple<T: FieldScalar>(&self, index: usize) -> Option<&[T]> {
        let c = self.components;
        self.values::<T>()?.get(index * c..(index + 1) * c)
    }

    /// Same name, type and width, `tuples` zeroed tuples.
    pub fn empty_like(&self, tuples: usize) -> FieldArray {
        FieldArray {
            name: self.name.clone(),
            components: self.components,
            values: self.values.zeroed_like(tuples * self.components),
        }
    }

    /// Copies tuple `source_idx` of `source` into tuple `target_idx` of `self`.
    pub fn copy_tuple_from(
        &mut self,
        target_idx: usize,
        source: &FieldArray,
        source_idx: usize,
    ) -> Result<(), AmrError> {
        if self.components != source.components {
            return Err(AmrError::FieldArrayMismatch {
                name: self.name.clone(),
                reason: format!(
                    "{} components in target, {} in source",
                    self.components, source.components
                ),
            });
        }
        if source_idx >= source.tuples() {
            return Err(AmrError::FieldIndexOutOfRange {
                name: source.name.clone(),
                index: source_idx,
                tuples: source.tuples(),
            });
        }
        if target_idx >= self.tuples() {
            return Err(AmrError::FieldIndexOutOfRange {
                name: self.name.clone(),
                index: target_idx,
                tuples: self.tuples(),
            });
        }
        let c = self.components;
        let (dst, src) = (target_idx * c, source_idx * c);
        match (&mut self.values, &source.values) {
            (ArrayValues::F64(d), ArrayValues::F64(s)) => copy_tuple(d, dst, s, src, c),
            (ArrayValues::F32(d), ArrayValues::F32(s)) => copy_tuple(d, dst, s, src, c),
            (ArrayValues::I32(d), ArrayValues::I32(s)) => copy_tuple(d, dst, s, src, c),
            (ArrayValues::I64(d), ArrayValues::I64(s)) => copy_tuple(d, dst, s, src, c),
            (ArrayValues::U32(d), ArrayValues::U32(s)) => copy_tuple(d, dst, s, src, c),
            (ArrayValues::U64(d), ArrayValues::U64(s)) => copy_tuple(d, dst, s, src, c),
            (d, s) => {
                return Err(AmrError::FieldArrayMismatch {
                    name: self.name.clone(),
                    reason: format!(
                        "target is {}, source is {}",
                        d.scalar_type().as_str(),
                        s.scalar_type().as_str()
                    ),
                });
            }
        }
        Ok(())
    }
}

#[inline]
fn copy_tuple<T: Copy>(dst: &mut [T], at: usize, src: &[T], from: usize, width: usize) {
    dst[at..at + width].copy_from_slice(&src[from..from + width]);
}

/// Ordered collection of uniquely named arrays.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldData {
    arrays: Vec<FieldArray>,
}

impl FieldData {
    /// Empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `array`; names must be unique.
    pub fn add_array(&mut self, array: FieldArray) -> Result<(), AmrError> {
        if self.array(array.name()).is_some() {
            return Err(AmrError::DuplicateFieldArray(array.name));
        }
        self.arrays.push(array);
        Ok(())
    }

    /// Array called `name`, if present.
    pub fn array(&self, name: &str) -> Option<&FieldArray> {
        self.arrays.iter().find(|a| a.name == name)
    }

    /// All arrays in insertion order.
    pub fn arrays(&self) -> &[FieldArray] {
        &self.arrays
    }

    /// Number of arrays.
    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    /// True if no array is attached.
    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// Same arrays (names, types, widths, order) with `tuples` zeroed tuples.
    pub fn empty_like(&self, tuples: usize) -> FieldData {
        FieldData {
            arrays: self.arrays.iter().map(|a| a.empty_like(tuples)).collect(),
        }
    }
}

/// Copies one tuple of every array of `target` from the same-named array
/// of `source`.
pub fn copy_field_data(
    target: &mut FieldData,
    target_idx: usize,
    source: &FieldData,
    source_idx: usize,
) -> Result<(), AmrError> {
    for array in &mut target.arrays {
        let src = source
            .array(&array.name)
            .ok_or_else(|| AmrError::FieldArrayMismatch {
                name: array.name.clone(),
                reason: "missing from source field data".into(),
            })?;
        array.copy_tuple_from(target_idx, src, source_idx)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ragged_tuples() {
        let err = FieldArray::new("velocity", 3, vec![0.0f64; 7]).unwrap_err();
        assert!(matches!(err, AmrError::FieldArrayMismatch { .. }));
    }

    #[test]
    fn copy_preserves_name_type_and_width() {
        let mut source = FieldData::new();
        source
            .add_array(FieldArray::new("velocity", 3, (0..12).map(f64::from).collect()).unwrap())
            .unwrap();
        source
            .add_array(FieldArray::new("material", 1, vec![7i32, 8, 9, 10]).unwrap())
            .unwrap();
        let mut target = source.empty_like(2);
        copy_field_data(&mut target, 1, &source, 2).unwrap();

        let vel = target.array("velocity").unwrap();
        assert_eq!(vel.scalar_type(), ScalarType::F64);
        assert_eq!(vel.tuple::<f64>(0).unwrap(), &[0.0, 0.0, 0.0]);
        assert_eq!(vel.tuple::<f64>(1).unwrap(), &[6.0, 7.0, 8.0]);
        assert_eq!(target.array("material").unwrap().values::<i32>().unwrap(), &[0, 9]);
    }

    #[test]
    fn copy_reports_type_mismatch() {
        let mut target = FieldData::new();
        target
            .add_array(FieldArray::new("p", 1, vec![0.0f32; 2]).unwrap())
            .unwrap();
        let mut source = FieldData::new();
        source
            .add_array(FieldArray::new("p", 1, vec![1.0f64; 2]).unwrap())
            .unwrap();
        let err = copy_field_data(&mut target, 0, &source, 0).unwrap_err();
        assert!(matches!(err, AmrError::FieldArrayMismatch { .. }));
    }

    #[test]
    fn copy_reports_out_of_range() {
        let mut source = FieldData::new();
        source
            .add_array(FieldArray::new("p", 1, vec![1u64, 2]).unwrap())
            .unwrap();
        let mut target = source.empty_like(1);
        let err = copy_field_data(&mut target, 0, &source, 5).unwrap_err();
        assert_eq!(
            err,
            AmrError::FieldIndexOutOfRange {
                name: "p".into(),
                index: 5,
                tuples: 2
            }
        );
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut fd = FieldData::new();
        fd.add_array(FieldArray::new("p", 1, vec![1u32]).unwrap())
            .unwrap();
        let err = fd
            .add_array(FieldArray::new("p", 1, vec![2u32]).unwrap())
            .unwrap_err();
        assert_eq!(err, AmrError::DuplicateFieldArray("p".into()));
    }
}
