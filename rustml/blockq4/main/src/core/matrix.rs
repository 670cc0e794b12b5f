use crate::api::error::{QuantError, QuantResult};
use crate::api::traits::QuantElement;
use crate::api::types::*;
use crate::core::dequantize::dequantize;
use crate::core::qdq::quantize_qdq;
use crate::core::quantize::quantize_blockwise;
use crate::core::transpose::{transpose_block_major_to_qdq, transpose_qdq_to_block_major};

/// Owned packed codes plus the metadata needed to read them back.
///
/// `order` and `encoding` travel with the buffers so that a single
/// dequantize path can interpret block-major, QDQ, biased and signed codes.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedMatrix<T> {
    pub data: Vec<u8>,
    pub scales: Vec<T>,
    pub zero_points: Option<Vec<u8>>,
    pub params: QuantParams,
    pub order: PackedOrder,
    pub encoding: CodeEncoding,
}

struct Buffers<T> {
    data: Vec<u8>,
    scales: Vec<T>,
    zero_points: Option<Vec<u8>>,
}

impl<T: QuantElement> Buffers<T> {
    fn alloc(sizes: BufferSizes, with_zero_points: bool) -> Self {
        Self {
            data: vec![0u8; sizes.data_bytes],
            scales: vec![T::from_f32(0.0); sizes.scale_count],
            zero_points: with_zero_points.then(|| vec![0u8; sizes.zero_point_bytes]),
        }
    }

    fn packed_mut(&mut self) -> PackedMut<'_, T> {
        PackedMut {
            data: &mut self.data,
            scales: &mut self.scales,
            zero_points: self.zero_points.as_deref_mut(),
        }
    }

    fn finish(self, params: QuantParams, order: PackedOrder, encoding: CodeEncoding) -> QuantizedMatrix<T> {
        QuantizedMatrix {
            data: self.data,
            scales: self.scales,
            zero_points: self.zero_points,
            params,
            order,
            encoding,
        }
    }
}

impl<T: QuantElement> QuantizedMatrix<T> {
    /// Quantize a row-major matrix into the block-major form.
    pub fn quantize(src: &[T], ld: usize, params: QuantParams, mode: QuantMode) -> QuantResult<Self> {
        let mut buffers = Buffers::alloc(params.buffer_sizes(), !mode.is_symmetric());
        let encoding = quantize_blockwise(src, ld, buffers.packed_mut(), mode, &params)?;
        Ok(buffers.finish(params, PackedOrder::BlockMajor, encoding))
    }

    /// Quantize a row-major matrix into the QDQ element-major form.
    pub fn quantize_qdq(src: &[T], ld: usize, params: QuantParams, mode: QuantMode) -> QuantResult<Self> {
        let mut buffers = Buffers::alloc(params.qdq_buffer_sizes(), !mode.is_symmetric());
        let signed = quantize_qdq(src, ld, buffers.packed_mut(), mode, &params)?;
        let encoding = if signed { CodeEncoding::Signed } else { CodeEncoding::ZeroPoint };
        Ok(buffers.finish(params, PackedOrder::ElementMajor, encoding))
    }

    pub fn as_packed(&self) -> PackedRef<'_, T> {
        PackedRef {
            data: &self.data,
            scales: &self.scales,
            zero_points: self.zero_points.as_deref(),
        }
    }

    pub fn mode(&self) -> QuantMode {
        self.encoding.mode()
    }

    pub fn is_signed(&self) -> bool {
        self.encoding.is_signed()
    }

    /// Dequantize into a new contiguous row-major buffer.
    pub fn dequantize(&self) -> QuantResult<Vec<T>> {
        let mut out = vec![T::from_f32(0.0); self.params.numel()];
        self.dequantize_into(&mut out, self.params.columns)?;
        Ok(out)
    }

    pub fn dequantize_into(&self, dst: &mut [T], ld: usize) -> QuantResult<()> {
        dequantize(self.as_packed(), self.encoding, self.order, &self.params, dst, ld)
    }

    /// Same quantization in block-major form, without reconstructing values.
    pub fn to_block_major(&self) -> QuantResult<Self> {
        if self.order == PackedOrder::BlockMajor {
            return Ok(self.clone());
        }
        let signed = self.is_signed();
        let mut buffers = Buffers::alloc(self.params.buffer_sizes(), self.zero_points.is_some());
        transpose_qdq_to_block_major(self.as_packed(), buffers.packed_mut(), signed, &self.params)?;
        let encoding = if signed { CodeEncoding::Biased } else { self.encoding };
        Ok(buffers.finish(self.params, PackedOrder::BlockMajor, encoding))
    }

    /// Same quantization in QDQ form; symmetric codes become signed.
    pub fn to_element_major(&self) -> QuantResult<Self> {
        if self.order == PackedOrder::ElementMajor {
            return Ok(self.clone());
        }
        let signed = self.encoding == CodeEncoding::Biased;
        let mut buffers = Buffers::alloc(self.params.qdq_buffer_sizes(), self.zero_points.is_some());
        transpose_block_major_to_qdq(self.as_packed(), buffers.packed_mut(), signed, &self.params)?;
        let encoding = if signed { CodeEncoding::Signed } else { self.encoding };
        Ok(buffers.finish(self.params, PackedOrder::ElementMajor, encoding))
    }

    /// Reinterpret block-major codes as the quantization of the transposed
    /// matrix: rowwise blocks of M are columnwise blocks of Mᵀ byte for byte.
    pub fn into_transposed(self) -> QuantResult<Self> {
        if self.order != PackedOrder::BlockMajor {
            return Err(QuantError::InvalidData(
                "only block-major codes can be reinterpreted as transposed".to_string(),
            ));
        }
        Ok(Self { params: self.params.transposed(), ..self })
    }

    /// Raw bytes of the scale metadata in native byte order.
    pub fn scale_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.scales)
    }

    /// Bytes of packed data and metadata.
    pub fn storage_bytes(&self) -> usize {
        self.data.len()
            + self.scales.len() * std::mem::size_of::<T>()
            + self.zero_points.as_ref().map_or(0, |z| z.len())
    }
}
