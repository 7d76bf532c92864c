use serde_json::Value;

/// A dense, row-major block of `f64` values with an explicit shape, as stored in
/// a parameter record.
///
/// A 0-dimensional tensor (a bare number) has an empty `shape` and one value.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

impl Tensor {
    /// Builds a tensor from a JSON number or a rectangular nest of arrays of numbers.
    ///
    /// Returns `Ok(None)` when `value` is not numeric at all (a string, object, ...),
    /// and an error message when it is an array but ragged or mixed.
    ///
    /// # Examples
    /// ```
    /// # use xvrkit::tensor::Tensor;
    /// let value = serde_json::json!([[1.0, 2.0, 3.0]]);
    /// let t = Tensor::from_json(&value).unwrap().unwrap();
    /// assert_eq!(t.shape, vec![1, 3]);
    /// assert_eq!(t.squeeze().shape, vec![3]);
    /// ```
    pub fn from_json(value: &Value) -> Result<Option<Tensor>, String> {
        match value {
            Value::Number(_) | Value::Array(_) => {}
            _ => return Ok(None),
        }
        let shape = infer_shape(value);
        let mut data = Vec::with_capacity(shape.iter().product());
        flatten_into(value, &shape, &mut data)?;
        Ok(Some(Tensor { shape, data }))
    }

    pub fn from_vec(shape: Vec<usize>, data: Vec<f64>) -> Tensor {
        debug_assert_eq!(shape.iter().product::<usize>(), data.len());
        Tensor { shape, data }
    }

    /// Removes every dimension of size 1.
    pub fn squeeze(&self) -> Tensor {
        Tensor {
            shape: self.shape.iter().copied().filter(|&d| d != 1).collect(),
            data: self.data.clone(),
        }
    }

    /// Gives a 0-dimensional tensor the shape `[1]`; leaves anything else alone.
    pub fn at_least_1d(mut self) -> Tensor {
        if self.shape.is_empty() {
            self.shape.push(1);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// Shape is taken from the first element at each level; flatten_into checks the rest.
fn infer_shape(value: &Value) -> Vec<usize> {
    let mut shape = Vec::new();
    let mut current = value;
    while let Value::Array(items) = current {
        shape.push(items.len());
        match items.first() {
            Some(first) => current = first,
            None => break,
        }
    }
    shape
}

fn flatten_into(value: &Value, shape: &[usize], out: &mut Vec<f64>) -> Result<(), String> {
    match (value, shape.split_first()) {
        (Value::Number(n), None) => {
            let v = n
                .as_f64()
                .ok_or_else(|| format!("number {} is not representable as f64", n))?;
            out.push(v);
            Ok(())
        }
        (Value::Array(items), Some((&len, rest))) => {
            if items.len() != len {
                return Err(format!(
                    "ragged array: expected {} elements, found {}",
                    len,
                    items.len()
                ));
            }
            for item in items {
                flatten_into(item, rest, out)?;
            }
            Ok(())
        }
        (Value::Array(_), None) => Err("array nested deeper than its siblings".to_string()),
        (Value::Number(_), Some(_)) => Err("number where an array was expected".to_string()),
        (other, _) => Err(format!("non-numeric element in tensor: {}", other)),
    }
}
