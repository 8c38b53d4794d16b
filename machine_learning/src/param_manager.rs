use std::mem;

use crate::{MlErr, Result, optimization::Optimizer};

/// Manages the parameters of a model and the gradient computed for them.
///
/// Both buffers are flat and share the same layout: every layer owns a contiguous slice, in the
/// order the layers are traversed on the forward pass. The slices can be walked from the front
/// with a `FrontIter` and from the back with a `BackIter`.
#[derive(Debug, Clone)]
pub struct ParamManager {
    params: Vec<f32>,
    grad: Vec<f32>,
}

impl ParamManager {
    /// Creates a new `ParamManager`.
    ///
    /// # Arguments
    /// * `params` - The initial parameters of the model.
    ///
    /// # Returns
    /// A new `ParamManager` instance with a zeroed gradient.
    pub fn new(params: Vec<f32>) -> Self {
        let grad = vec![0.0; params.len()];
        Self { params, grad }
    }

    /// Returns the amount of parameters being managed.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut [f32] {
        &mut self.params
    }

    pub fn grad(&self) -> &[f32] {
        &self.grad
    }

    /// Sets every value of the gradient to zero.
    pub fn zero_grad(&mut self) {
        self.grad.fill(0.0);
    }

    /// Borrows the parameters immutably and the gradient mutably at the same time, as needed by
    /// the backward pass.
    pub fn split_mut(&mut self) -> (&[f32], &mut [f32]) {
        (&self.params, &mut self.grad)
    }

    /// Applies a step of the given optimizer using the current gradient.
    ///
    /// # Arguments
    /// * `optimizer` - The optimization algorithm.
    ///
    /// # Returns
    /// An error if the optimizer was built for a different amount of parameters.
    pub fn optimize<O>(&mut self, optimizer: &mut O) -> Result<()>
    where
        O: Optimizer + ?Sized,
    {
        optimizer.update_params(&mut self.params, &self.grad)
    }
}

/// Yields consecutive parameter slices following the forward layout.
pub struct FrontIter<'pm> {
    params: &'pm [f32],
}

impl<'pm> FrontIter<'pm> {
    pub fn new(params: &'pm [f32]) -> Self {
        Self { params }
    }

    /// Takes the next `n` parameters.
    ///
    /// # Arguments
    /// * `n` - The amount of parameters to take.
    ///
    /// # Returns
    /// A slice of parameters or an error if there are less than `n` parameters left.
    pub fn next(&mut self, n: usize) -> Result<&'pm [f32]> {
        if n > self.params.len() {
            return Err(MlErr::SizeMismatch {
                what: "forward parameters",
                got: self.params.len(),
                expected: n,
            });
        }

        let (head, tail) = self.params.split_at(n);
        self.params = tail;
        Ok(head)
    }

    /// Checks that every parameter was consumed.
    pub fn finish(self) -> Result<()> {
        match self.params.len() {
            0 => Ok(()),
            left => Err(MlErr::SizeMismatch {
                what: "unused forward parameters",
                got: left,
                expected: 0,
            }),
        }
    }
}

/// Yields parameter and gradient slices following the reversed layout.
pub struct BackIter<'pm> {
    params: &'pm [f32],
    grad: &'pm mut [f32],
}

impl<'pm> BackIter<'pm> {
    pub fn new(params: &'pm [f32], grad: &'pm mut [f32]) -> Result<Self> {
        if params.len() != grad.len() {
            return Err(MlErr::SizeMismatch {
                what: "gradient",
                got: grad.len(),
                expected: params.len(),
            });
        }

        Ok(Self { params, grad })
    }

    /// Takes the last `n` parameters and their gradient.
    ///
    /// # Arguments
    /// * `n` - The amount of parameters to take.
    ///
    /// # Returns
    /// A tuple with the parameters and the gradient, or an error if there are less than `n`
    /// parameters left.
    pub fn next(&mut self, n: usize) -> Result<(&'pm [f32], &'pm mut [f32])> {
        let len = self.params.len();
        if n > len {
            return Err(MlErr::SizeMismatch {
                what: "backward parameters",
                got: len,
                expected: n,
            });
        }

        let (params_head, params_tail) = self.params.split_at(len - n);
        self.params = params_head;

        let grad = mem::take(&mut self.grad);
        let (grad_head, grad_tail) = grad.split_at_mut(len - n);
        self.grad = grad_head;

        Ok((params_tail, grad_tail))
    }

    /// Checks that every parameter was consumed.
    pub fn finish(self) -> Result<()> {
        match self.params.len() {
            0 => Ok(()),
            left => Err(MlErr::SizeMismatch {
                what: "unused backward parameters",
                got: left,
                expected: 0,
            }),
        }
    }
}
