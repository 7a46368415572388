//! Dtype dispatch: decoding snapshot values and minting zero values.

use cowrite_types::DType;

use crate::error::{ClientError, ClientResult};
use crate::value::{Register, TextValue, Value};

/// Parses a dtype tag received from the authority.
///
/// An unknown tag means the authority speaks a newer protocol.
pub fn parse_dtype(tag: &str) -> ClientResult<DType> {
    tag.parse()
        .map_err(|_| ClientError::Protocol(format!("unknown dtype: {tag}")))
}

/// Decodes a snapshot value of the given dtype.
pub fn decode_value(dtype: DType, encoded: &str) -> ClientResult<Value> {
    match dtype {
        DType::CRegister => Ok(Register::decode(encoded)?.into()),
        DType::CString => Ok(TextValue::decode(encoded)?.into()),
        DType::Delete => Err(ClientError::Unimplemented("delete values")),
    }
}

/// Creates the empty value of the given dtype.
pub fn new_zero_value(dtype: DType) -> ClientResult<Value> {
    match dtype {
        DType::CRegister => Ok(Register::new().into()),
        DType::CString => Ok(TextValue::new().into()),
        DType::Delete => Err(ClientError::Unimplemented("delete values")),
    }
}
