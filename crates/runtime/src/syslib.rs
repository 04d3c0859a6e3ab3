//! System library
//!
//! The classic arithmetic library as a native component. Every routine
//! reads its operands from fixed variables and writes its results back
//! the same way a library written in the language itself would.
//!
//! | label | effect |
//! |-------|--------|
//! | (1000) | .3 <- .1 + .2, overflow faults |
//! | (1009) | .3 <- .1 + .2, .4 <- overflow flag |
//! | (1010) | .3 <- .1 - .2 |
//! | (1020) | .1 <- .1 + #1 |
//! | (1030) | .3 <- .1 * .2, overflow faults |
//! | (1039) | .3 <- .1 * .2, .4 <- overflow flag |
//! | (1040) | .3 <- .1 / .2, #0 when .2 is #0 |
//! | (1050) | .2 <- :1 / .1, #0 when .1 is #0 |
//! | (1500) | :3 <- :1 + :2, overflow faults |
//! | (1509) | :3 <- :1 + :2, :4 <- overflow flag |
//! | (1510) | :3 <- :1 - :2 |
//! | (1520) | :1 <- .1 concatenated with .2 |
//! | (1530) | :1 <- .1 * .2 |
//! | (1540) | :3 <- :1 * :2, overflow faults |
//! | (1549) | :3 <- :1 * :2, :4 <- overflow flag |
//! | (1550) | :3 <- :1 / :2, #0 when :2 is #0 |
//! | (1900) | .1 <- uniform random 16-bit value |
//! | (1910) | .2 <- normal random value in 0 to .1, spread .1/12 |
//!
//! Flags are #1 for no overflow and #2 for overflow.

use crate::engine::Context;
use crate::linkage::Component;
use cringe_core::{Fault, VarClass, VarName};

const fn spot(n: u16) -> VarName {
    VarName::new(VarClass::Spot, n)
}

const fn two_spot(n: u16) -> VarName {
    VarName::new(VarClass::TwoSpot, n)
}

const NO_OVERFLOW: u32 = 1;
const OVERFLOWED: u32 = 2;

fn flag(overflowed: bool) -> u32 {
    if overflowed { OVERFLOWED } else { NO_OVERFLOW }
}

/// 16-bit result, or None when it does not fit
fn narrow(value: u64) -> Option<u32> {
    (value <= 0xFFFF).then_some(value as u32)
}

fn wide(value: u64) -> Option<u32> {
    u32::try_from(value).ok()
}

fn operands(ctx: &Context, a: VarName, b: VarName) -> Result<(u64, u64), Fault> {
    Ok((u64::from(ctx.get_scalar(a)?), u64::from(ctx.get_scalar(b)?)))
}

/// Store a checked result, faulting on overflow.
fn store_checked(ctx: &Context, target: VarName, result: Option<u32>) -> Result<bool, Fault> {
    ctx.set_scalar(target, result.ok_or(Fault::Overflow)?)?;
    Ok(false)
}

/// Store a result truncated to the target's width and report overflow in `flag_var`.
fn store_flagged(
    ctx: &Context,
    target: VarName,
    flag_var: VarName,
    raw: u64,
    result: Option<u32>,
) -> Result<bool, Fault> {
    let mask = u64::from(target.class.width().mask());
    ctx.set_scalar(target, (raw & mask) as u32)?;
    ctx.set_scalar(flag_var, flag(result.is_none()))?;
    Ok(false)
}

fn add16(ctx: &Context) -> Result<bool, Fault> {
    let (a, b) = operands(ctx, spot(1), spot(2))?;
    store_checked(ctx, spot(3), narrow(a + b))
}

fn add16_flag(ctx: &Context) -> Result<bool, Fault> {
    let (a, b) = operands(ctx, spot(1), spot(2))?;
    store_flagged(ctx, spot(3), spot(4), a + b, narrow(a + b))
}

fn sub16(ctx: &Context) -> Result<bool, Fault> {
    let (a, b) = operands(ctx, spot(1), spot(2))?;
    ctx.set_scalar(spot(3), (a as u16).wrapping_sub(b as u16).into())?;
    Ok(false)
}

fn increment(ctx: &Context) -> Result<bool, Fault> {
    let a = ctx.get_scalar(spot(1))?;
    ctx.set_scalar(spot(1), (a as u16).wrapping_add(1).into())?;
    Ok(false)
}

fn mul16(ctx: &Context) -> Result<bool, Fault> {
    let (a, b) = operands(ctx, spot(1), spot(2))?;
    store_checked(ctx, spot(3), narrow(a * b))
}

fn mul16_flag(ctx: &Context) -> Result<bool, Fault> {
    let (a, b) = operands(ctx, spot(1), spot(2))?;
    store_flagged(ctx, spot(3), spot(4), a * b, narrow(a * b))
}

fn div16(ctx: &Context) -> Result<bool, Fault> {
    let (a, b) = operands(ctx, spot(1), spot(2))?;
    let quotient = a.checked_div(b).unwrap_or(0);
    ctx.set_scalar(spot(3), quotient as u32)?;
    Ok(false)
}

fn div32_by16(ctx: &Context) -> Result<bool, Fault> {
    let (a, b) = operands(ctx, two_spot(1), spot(1))?;
    let quotient = a.checked_div(b).unwrap_or(0);
    store_checked(ctx, spot(2), narrow(quotient))
}

fn add32(ctx: &Context) -> Result<bool, Fault> {
    let (a, b) = operands(ctx, two_spot(1), two_spot(2))?;
    store_checked(ctx, two_spot(3), wide(a + b))
}

fn add32_flag(ctx: &Context) -> Result<bool, Fault> {
    let (a, b) = operands(ctx, two_spot(1), two_spot(2))?;
    store_flagged(ctx, two_spot(3), two_spot(4), a + b, wide(a + b))
}

fn sub32(ctx: &Context) -> Result<bool, Fault> {
    let (a, b) = operands(ctx, two_spot(1), two_spot(2))?;
    ctx.set_scalar(two_spot(3), (a as u32).wrapping_sub(b as u32))?;
    Ok(false)
}

fn concat(ctx: &Context) -> Result<bool, Fault> {
    let (hi, lo) = operands(ctx, spot(1), spot(2))?;
    ctx.set_scalar(two_spot(1), ((hi << 16) | lo) as u32)?;
    Ok(false)
}

fn mul16_wide(ctx: &Context) -> Result<bool, Fault> {
    let (a, b) = operands(ctx, spot(1), spot(2))?;
    store_checked(ctx, two_spot(1), wide(a * b))
}

fn mul32(ctx: &Context) -> Result<bool, Fault> {
    let (a, b) = operands(ctx, two_spot(1), two_spot(2))?;
    store_checked(ctx, two_spot(3), wide(a * b))
}

fn mul32_flag(ctx: &Context) -> Result<bool, Fault> {
    let (a, b) = operands(ctx, two_spot(1), two_spot(2))?;
    store_flagged(ctx, two_spot(3), two_spot(4), a * b, wide(a * b))
}

fn div32(ctx: &Context) -> Result<bool, Fault> {
    let (a, b) = operands(ctx, two_spot(1), two_spot(2))?;
    let quotient = a.checked_div(b).unwrap_or(0);
    ctx.set_scalar(two_spot(3), quotient as u32)?;
    Ok(false)
}

fn uniform(ctx: &Context) -> Result<bool, Fault> {
    ctx.set_scalar(spot(1), ctx.random_below(0x1_0000))?;
    Ok(false)
}

fn normal(ctx: &Context) -> Result<bool, Fault> {
    let bound = ctx.get_scalar(spot(1))? + 1;
    // Mean of twelve uniforms: centred on .1/2 with deviation .1/12
    let sum: u32 = (0..12).map(|_| ctx.random_below(bound)).sum();
    ctx.set_scalar(spot(2), sum / 12)?;
    Ok(false)
}

/// The system library as a linkable component
pub fn component() -> Component {
    Component::new("syslib")
        .export(1000, add16)
        .export(1009, add16_flag)
        .export(1010, sub16)
        .export(1020, increment)
        .export(1030, mul16)
        .export(1039, mul16_flag)
        .export(1040, div16)
        .export(1050, div32_by16)
        .export(1500, add32)
        .export(1509, add32_flag)
        .export(1510, sub32)
        .export(1520, concat)
        .export(1530, mul16_wide)
        .export(1540, mul32)
        .export(1549, mul32_flag)
        .export(1550, div32)
        .export(1900, uniform)
        .export(1910, normal)
}
