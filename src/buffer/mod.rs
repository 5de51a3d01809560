// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Aligned, typed, fixed-size numeric buffers.
//!
//! Every kernel in this crate reads from and writes to [`AlignedBuffer`]s. The
//! backing memory of a buffer starts on an [`ALIGNMENT`]-byte boundary, which
//! is wide enough for the widest SIMD registers we expect to target (AVX-512).
//! A buffer's element count and shape are fixed when it is allocated; there is
//! no way to resize one.
//!
//! Releasing a buffer consumes it ([`AlignedBuffer::release`]), so any attempt
//! to use a buffer after it has been released is rejected by the compiler.
//!
//! [`AnyBuffer`] is a closed sum type over the supported element types (see
//! [`ElementType`]). It exists for callers that only learn the element type at
//! runtime; kernels themselves are generic over [`Element`].

mod error;

pub use error::BufferError;

use std::{
    alloc::{self, Layout},
    fmt,
    marker::PhantomData,
    ops::{Deref, DerefMut},
    ptr::NonNull,
};

use ndarray::{ArrayViewD, ArrayViewMutD, IxDyn};

/// The byte boundary that all buffer allocations are aligned to.
pub const ALIGNMENT: usize = 64;

static_assertions::const_assert!(ALIGNMENT.is_power_of_two());
static_assertions::const_assert!(ALIGNMENT >= std::mem::align_of::<f64>());

/// Is the supplied pointer aligned to [`ALIGNMENT`]? Null pointers are
/// considered aligned.
pub fn is_aligned<T>(ptr: *const T) -> bool {
    (ptr as usize) % ALIGNMENT == 0
}

/// All of the scalar types that a buffer may hold.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::EnumIter,
    strum_macros::EnumString,
)]
pub enum ElementType {
    #[strum(serialize = "bool")]
    Bool,

    #[strum(serialize = "int8")]
    Int8,

    #[strum(serialize = "int32")]
    Int32,

    #[strum(serialize = "float")]
    Float,

    #[strum(serialize = "double")]
    Double,
}

impl ElementType {
    /// The size of a single element \[bytes\].
    pub fn size_of(self) -> usize {
        match self {
            ElementType::Bool => std::mem::size_of::<bool>(),
            ElementType::Int8 => std::mem::size_of::<i8>(),
            ElementType::Int32 => std::mem::size_of::<i32>(),
            ElementType::Float => std::mem::size_of::<f32>(),
            ElementType::Double => std::mem::size_of::<f64>(),
        }
    }
}

mod private {
    pub trait Sealed {}
}

/// A scalar type that can live inside an [`AlignedBuffer`]. This trait is
/// sealed; the set of implementors is exactly the set of [`ElementType`]
/// variants.
pub trait Element:
    private::Sealed
    + bytemuck::Zeroable
    + Copy
    + PartialEq
    + fmt::Debug
    + Send
    + Sync
    + 'static
{
    const ELEMENT_TYPE: ElementType;

    #[doc(hidden)]
    fn into_any(buffer: AlignedBuffer<Self>) -> AnyBuffer;

    #[doc(hidden)]
    fn from_any(buffer: AnyBuffer) -> Result<AlignedBuffer<Self>, AnyBuffer>;

    #[doc(hidden)]
    fn from_any_ref(buffer: &AnyBuffer) -> Option<&AlignedBuffer<Self>>;

    #[doc(hidden)]
    fn from_any_mut(buffer: &mut AnyBuffer) -> Option<&mut AlignedBuffer<Self>>;

    #[doc(hidden)]
    fn into_scalars(values: &[Self]) -> Scalars<'_>;
}

macro_rules! impl_element {
    ($t:ty, $variant:ident) => {
        impl private::Sealed for $t {}

        impl Element for $t {
            const ELEMENT_TYPE: ElementType = ElementType::$variant;

            fn into_any(buffer: AlignedBuffer<Self>) -> AnyBuffer {
                AnyBuffer::$variant(buffer)
            }

            fn from_any(buffer: AnyBuffer) -> Result<AlignedBuffer<Self>, AnyBuffer> {
                match buffer {
                    AnyBuffer::$variant(b) => Ok(b),
                    other => Err(other),
                }
            }

            fn from_any_ref(buffer: &AnyBuffer) -> Option<&AlignedBuffer<Self>> {
                match buffer {
                    AnyBuffer::$variant(b) => Some(b),
                    _ => None,
                }
            }

            fn from_any_mut(buffer: &mut AnyBuffer) -> Option<&mut AlignedBuffer<Self>> {
                match buffer {
                    AnyBuffer::$variant(b) => Some(b),
                    _ => None,
                }
            }

            fn into_scalars(values: &[Self]) -> Scalars<'_> {
                Scalars::$variant(values)
            }
        }
    };
}

impl_element!(bool, Bool);
impl_element!(i8, Int8);
impl_element!(i32, Int32);
impl_element!(f32, Float);
impl_element!(f64, Double);

/// Borrowed initial values for an [`AnyBuffer`], tagged with their type.
#[derive(Debug, Clone, Copy)]
pub enum Scalars<'a> {
    Bool(&'a [bool]),
    Int8(&'a [i8]),
    Int32(&'a [i32]),
    Float(&'a [f32]),
    Double(&'a [f64]),
}

impl Scalars<'_> {
    pub fn element_type(&self) -> ElementType {
        match self {
            Scalars::Bool(_) => ElementType::Bool,
            Scalars::Int8(_) => ElementType::Int8,
            Scalars::Int32(_) => ElementType::Int32,
            Scalars::Float(_) => ElementType::Float,
            Scalars::Double(_) => ElementType::Double,
        }
    }
}

impl<'a, T: Element> From<&'a [T]> for Scalars<'a> {
    fn from(values: &'a [T]) -> Self {
        T::into_scalars(values)
    }
}

/// How the contents of a new buffer are set.
#[derive(Debug, Clone, Copy)]
pub enum InitPolicy<'a> {
    /// The contents are unspecified and must be written before they are read.
    /// (They happen to be zeroed, so reading them is not undefined behaviour.)
    Uninitialized,

    /// Copy these values into the buffer. There must be exactly as many values
    /// as the shape demands.
    FromValues(Scalars<'a>),
}

/// An owned, contiguous block of `T`, aligned to [`ALIGNMENT`] bytes, with a
/// logical (row-major) shape.
pub struct AlignedBuffer<T: Element> {
    ptr: NonNull<T>,
    len: usize,
    shape: Vec<usize>,
    layout: Layout,
    _marker: PhantomData<T>,
}

// SAFETY: The buffer uniquely owns its allocation and `T` is `Send + Sync`.
unsafe impl<T: Element> Send for AlignedBuffer<T> {}
unsafe impl<T: Element> Sync for AlignedBuffer<T> {}

impl<T: Element> AlignedBuffer<T> {
    /// Allocate a buffer without caring about its contents.
    pub fn uninitialized(shape: &[usize]) -> Result<AlignedBuffer<T>, BufferError> {
        let len = shape
            .iter()
            .try_fold(1_usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| BufferError::TooLarge {
                shape: shape.to_vec(),
            })?;
        let num_bytes = len
            .checked_mul(std::mem::size_of::<T>())
            .ok_or_else(|| BufferError::TooLarge {
                shape: shape.to_vec(),
            })?;
        // Zero-sized allocations are not allowed, so always ask for at least
        // one alignment's worth of bytes.
        let layout = Layout::from_size_align(num_bytes.max(ALIGNMENT), ALIGNMENT).map_err(|_| {
            BufferError::TooLarge {
                shape: shape.to_vec(),
            }
        })?;

        // SAFETY: `layout` has a non-zero size. All-zero bytes are a valid `T`
        // because `T: Zeroable`.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = match NonNull::new(raw.cast::<T>()) {
            Some(p) => p,
            None => alloc::handle_alloc_error(layout),
        };

        Ok(AlignedBuffer {
            ptr,
            len,
            shape: shape.to_vec(),
            layout,
            _marker: PhantomData,
        })
    }

    /// Allocate a buffer and fill it with zeros.
    pub fn zeros(shape: &[usize]) -> Result<AlignedBuffer<T>, BufferError> {
        // Fresh allocations are already zeroed.
        Self::uninitialized(shape)
    }

    /// Allocate a buffer with every element set to `value`.
    pub fn from_elem(shape: &[usize], value: T) -> Result<AlignedBuffer<T>, BufferError> {
        let mut buffer = Self::uninitialized(shape)?;
        buffer.as_mut_slice().fill(value);
        Ok(buffer)
    }

    /// Allocate a buffer holding a copy of `values`. The number of values must
    /// equal the product of `shape`.
    pub fn from_values(shape: &[usize], values: &[T]) -> Result<AlignedBuffer<T>, BufferError> {
        let mut buffer = Self::uninitialized(shape)?;
        if values.len() != buffer.len {
            return Err(BufferError::ShapeMismatch {
                shape: shape.to_vec(),
                expected: buffer.len,
                actual: values.len(),
            });
        }
        buffer.as_mut_slice().copy_from_slice(values);
        Ok(buffer)
    }

    /// Release the buffer's memory. The buffer cannot be used afterwards.
    pub fn release(self) {
        drop(self)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The total number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn element_type(&self) -> ElementType {
        T::ELEMENT_TYPE
    }

    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `ptr` is valid for `len` initialised elements for as long as
        // `self` lives.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: As above, and `&mut self` guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// An n-dimensional view of the buffer using its shape.
    pub fn view(&self) -> ArrayViewD<'_, T> {
        // SAFETY: The product of `shape` is `len` and the data is contiguous
        // and row-major.
        unsafe { ArrayViewD::from_shape_ptr(IxDyn(&self.shape), self.ptr.as_ptr()) }
    }

    /// A mutable n-dimensional view of the buffer using its shape.
    pub fn view_mut(&mut self) -> ArrayViewMutD<'_, T> {
        // SAFETY: As above, and `&mut self` guarantees exclusive access.
        unsafe { ArrayViewMutD::from_shape_ptr(IxDyn(&self.shape), self.ptr.as_ptr()) }
    }
}

impl<T: Element> Drop for AlignedBuffer<T> {
    fn drop(&mut self) {
        // SAFETY: `ptr` was allocated with exactly `layout`.
        unsafe { alloc::dealloc(self.ptr.as_ptr().cast::<u8>(), self.layout) }
    }
}

impl<T: Element> Clone for AlignedBuffer<T> {
    fn clone(&self) -> Self {
        let layout = self.layout;
        // SAFETY: `layout` has a non-zero size (see `uninitialized`).
        let raw = unsafe { alloc::alloc(layout) };
        let ptr = match NonNull::new(raw.cast::<T>()) {
            Some(p) => p,
            None => alloc::handle_alloc_error(layout),
        };
        // SAFETY: Both allocations are at least `len` elements long and they
        // cannot overlap.
        unsafe { std::ptr::copy_nonoverlapping(self.ptr.as_ptr(), ptr.as_ptr(), self.len) };

        AlignedBuffer {
            ptr,
            len: self.len,
            shape: self.shape.clone(),
            layout,
            _marker: PhantomData,
        }
    }
}

impl<T: Element> Deref for AlignedBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Element> DerefMut for AlignedBuffer<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Element> fmt::Debug for AlignedBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("element_type", &T::ELEMENT_TYPE)
            .field("shape", &self.shape)
            .field("data", &self.as_slice())
            .finish()
    }
}

/// An [`AlignedBuffer`] of any supported element type.
#[derive(Debug, Clone)]
pub enum AnyBuffer {
    Bool(AlignedBuffer<bool>),
    Int8(AlignedBuffer<i8>),
    Int32(AlignedBuffer<i32>),
    Float(AlignedBuffer<f32>),
    Double(AlignedBuffer<f64>),
}

/// Apply the same expression to whichever typed buffer is inside an
/// [`AnyBuffer`].
macro_rules! for_each_variant {
    ($buffer:expr, $b:ident => $body:expr) => {
        match $buffer {
            AnyBuffer::Bool($b) => $body,
            AnyBuffer::Int8($b) => $body,
            AnyBuffer::Int32($b) => $body,
            AnyBuffer::Float($b) => $body,
            AnyBuffer::Double($b) => $body,
        }
    };
}

impl AnyBuffer {
    /// Allocate a buffer of the given element type and shape.
    pub fn allocate(
        element_type: ElementType,
        shape: &[usize],
        init: InitPolicy,
    ) -> Result<AnyBuffer, BufferError> {
        match init {
            InitPolicy::Uninitialized => Ok(match element_type {
                ElementType::Bool => AnyBuffer::Bool(AlignedBuffer::uninitialized(shape)?),
                ElementType::Int8 => AnyBuffer::Int8(AlignedBuffer::uninitialized(shape)?),
                ElementType::Int32 => AnyBuffer::Int32(AlignedBuffer::uninitialized(shape)?),
                ElementType::Float => AnyBuffer::Float(AlignedBuffer::uninitialized(shape)?),
                ElementType::Double => AnyBuffer::Double(AlignedBuffer::uninitialized(shape)?),
            }),

            InitPolicy::FromValues(values) => {
                if values.element_type() != element_type {
                    return Err(BufferError::ElementTypeMismatch {
                        expected: element_type,
                        actual: values.element_type(),
                    });
                }
                Ok(match values {
                    Scalars::Bool(v) => AnyBuffer::Bool(AlignedBuffer::from_values(shape, v)?),
                    Scalars::Int8(v) => AnyBuffer::Int8(AlignedBuffer::from_values(shape, v)?),
                    Scalars::Int32(v) => AnyBuffer::Int32(AlignedBuffer::from_values(shape, v)?),
                    Scalars::Float(v) => AnyBuffer::Float(AlignedBuffer::from_values(shape, v)?),
                    Scalars::Double(v) => AnyBuffer::Double(AlignedBuffer::from_values(shape, v)?),
                })
            }
        }
    }

    /// Allocate a buffer holding a copy of `values`; the element type is taken
    /// from `T`.
    pub fn from_values<T: Element>(shape: &[usize], values: &[T]) -> Result<AnyBuffer, BufferError> {
        Ok(T::into_any(AlignedBuffer::from_values(shape, values)?))
    }

    pub fn element_type(&self) -> ElementType {
        for_each_variant!(self, b => b.element_type())
    }

    pub fn shape(&self) -> &[usize] {
        for_each_variant!(self, b => b.shape())
    }

    pub fn len(&self) -> usize {
        for_each_variant!(self, b => b.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the typed buffer, if it holds `T`s.
    pub fn downcast_ref<T: Element>(&self) -> Option<&AlignedBuffer<T>> {
        T::from_any_ref(self)
    }

    /// Get the mutable typed buffer, if it holds `T`s.
    pub fn downcast_mut<T: Element>(&mut self) -> Option<&mut AlignedBuffer<T>> {
        T::from_any_mut(self)
    }

    /// Convert into the typed buffer. Fails if the buffer doesn't hold `T`s.
    pub fn into_typed<T: Element>(self) -> Result<AlignedBuffer<T>, BufferError> {
        T::from_any(self).map_err(|other| BufferError::ElementTypeMismatch {
            expected: T::ELEMENT_TYPE,
            actual: other.element_type(),
        })
    }

    /// Release the buffer's memory. The buffer cannot be used afterwards.
    pub fn release(self) {
        for_each_variant!(self, b => b.release())
    }
}

impl<T: Element> From<AlignedBuffer<T>> for AnyBuffer {
    fn from(buffer: AlignedBuffer<T>) -> Self {
        T::into_any(buffer)
    }
}
