//! Pre-signature fee estimation from input and output counts.

use bitcoin::Script;
use strand_core::constants::WITNESS_SCALE_FACTOR;
use strand_core::network::{NetworkParams, TxSizeParams};
use strand_core::types::FeeRate;

/// Estimates transaction size and fee from structural counts.
///
/// Weight is `overhead + inputs * input_weight + outputs * output_weight`,
/// all in weight units. The estimate is monotone in both counts.
///
/// Payments to an arbitrary destination use [`FeeEstimator::payment_weight`],
/// which sizes the destination output from its actual script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeEstimator {
    sizes: TxSizeParams,
}

impl FeeEstimator {
    pub fn new(sizes: TxSizeParams) -> Self {
        Self { sizes }
    }

    pub fn from_params(params: &NetworkParams) -> Self {
        Self::new(params.sizes)
    }

    pub fn sizes(&self) -> &TxSizeParams {
        &self.sizes
    }

    /// Estimated weight in weight units.
    pub fn weight(&self, inputs: usize, outputs: usize) -> u64 {
        self.sizes
            .overhead_weight
            .saturating_add((inputs as u64).saturating_mul(self.sizes.input_weight))
            .saturating_add((outputs as u64).saturating_mul(self.sizes.output_weight))
    }

    /// Estimated virtual size, `ceil(weight / 4)`.
    pub fn vsize(&self, inputs: usize, outputs: usize) -> u64 {
        self.weight(inputs, outputs).div_ceil(WITNESS_SCALE_FACTOR)
    }

    /// Fee for `inputs` inputs and `outputs` outputs at `rate`.
    pub fn estimate(&self, inputs: usize, outputs: usize, rate: FeeRate) -> u64 {
        rate.fee_for_vsize(self.vsize(inputs, outputs))
    }

    /// Weight of a payment to `destination`, with an optional change output
    /// of the account's own kind.
    ///
    /// The destination output is never sized below its serialized script, so
    /// paying a wider script than the account's own does not underpay.
    pub fn payment_weight(&self, inputs: usize, destination: &Script, change: bool) -> u64 {
        let destination_weight = self
            .sizes
            .output_weight
            .max(output_weight_for_script(destination.len()));
        let change_weight = if change { self.sizes.output_weight } else { 0 };
        self.sizes
            .overhead_weight
            .saturating_add((inputs as u64).saturating_mul(self.sizes.input_weight))
            .saturating_add(destination_weight)
            .saturating_add(change_weight)
    }

    pub fn payment_vsize(&self, inputs: usize, destination: &Script, change: bool) -> u64 {
        self.payment_weight(inputs, destination, change)
            .div_ceil(WITNESS_SCALE_FACTOR)
    }

    /// Fee for a payment to `destination` at `rate`.
    pub fn estimate_payment(
        &self,
        inputs: usize,
        destination: &Script,
        change: bool,
        rate: FeeRate,
    ) -> u64 {
        rate.fee_for_vsize(self.payment_vsize(inputs, destination, change))
    }
}

/// Weight of one output paying to a script of `script_len` bytes: 8-byte
/// value, compact-size length prefix and the script, all non-witness.
pub fn output_weight_for_script(script_len: usize) -> u64 {
    let len = script_len as u64;
    let prefix = match len {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    };
    (8 + prefix + len).saturating_mul(WITNESS_SCALE_FACTOR)
}

impl Default for FeeEstimator {
    fn default() -> Self {
        Self::new(TxSizeParams::default())
    }
}
