use super::*;

/// Gradients of a fully-connected layer with respect to its input, weight and bias.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearGrad {
  pub input: Array2<f64>,
  pub weight: Array2<f64>,
  pub bias: Option<Array1<f64>>,
}

/// The gradient of `input · weightᵗ + bias`, given the gradient `grad_output` of its result.
///
/// The fast-path layers use this as-is, ignoring their quantisation (a straight-through
/// estimator).
///
///   - `grad_output`: `(batch, out_features)`
///   - `input`: `(batch, in_features)`
///   - `weight`: `(out_features, in_features)`
///
/// # Example
///
/// ```
/// # use unary_arith::linear_grad;
/// # use ndarray::array;
/// let grad = linear_grad(&array![[1., 2.]], &array![[3.]], &array![[0.5], [-1.]], true).unwrap();
/// assert_eq!(grad.input, array![[-1.5]]);
/// assert_eq!(grad.weight, array![[3.], [6.]]);
/// assert_eq!(grad.bias, Some(array![1., 2.]));
/// ```
pub fn linear_grad(
  grad_output: &Array2<f64>,
  input: &Array2<f64>,
  weight: &Array2<f64>,
  has_bias: bool,
) -> Result<LinearGrad> {
  let (out_features, in_features) = weight.dim();
  let batch = batch_of(input.shape(), in_features)?;
  if grad_output.dim() != (batch, out_features) {
    return Err(Error::shape(&[batch, out_features], grad_output.shape()))
  }
  Ok(LinearGrad {
    input: grad_output.dot(weight),
    weight: grad_output.t().dot(input),
    bias: has_bias.then(|| grad_output.sum_axis(Axis(0))),
  })
}
