//! Tunable search constants exposed under the `spsa` feature so an external
//! tuner can mutate them between `bench` runs, mirroring the teacher's
//! `spsa_param.rs` macro. Without the feature every constant is a plain
//! `const fn`, free of the `unsafe`-mutable-static machinery.

#[macro_export]
macro_rules! search_constants {
    ($($name:ident: $typ:ty = $value:expr;)*) => {
        #[cfg(not(feature = "spsa"))]
        pub mod sc {
            $(
                pub const fn $name() -> $typ { $value }
            )*
        }

        #[cfg(feature = "spsa")]
        pub mod sc {
            mod vals {
                $(
                    #[allow(non_upper_case_globals)]
                    pub(super) static mut $name: $typ = $value;
                )*
            }

            $(
                pub fn $name() -> $typ {
                    // SAFETY: SPSA tuning drives exactly one search thread at a time,
                    // same as the teacher's `spsa_param.rs`.
                    unsafe { vals::$name }
                }
            )*

            pub fn set_value(name: &str, value: isize) -> crate::Res<()> {
                unsafe {
                    match name {
                        $(stringify!($name) => vals::$name = value as $typ,)*
                        _ => return Err(format!("'{name}' is not a valid tunable search constant")),
                    }
                }
                Ok(())
            }
        }
    };
}

search_constants! {
    rfp_margin_per_depth: i32 = 75;
    nmp_base: i32 = 4;
    nmp_depth_divisor: i32 = 3;
    nmp_eval_divisor: i32 = 200;
    nmp_max_eval_reduction: i32 = 3;
    lmp_base: i32 = 3;
    lmp_depth_coeff: i32 = 2;
    fp_base: i32 = 60;
    fp_depth_coeff: i32 = 80;
    see_quiet_margin: i32 = 64;
    see_loud_margin: i32 = 20;
    singular_depth_min: i32 = 6;
    singular_beta_margin: i32 = 2;
    singular_double_margin: i32 = 16;
    fifty_move_scale_base: i32 = 200;
    fifty_move_scale_divisor: i32 = 200;
    lmr_constant: f64 = -0.4;
    lmr_depth_coeff: f64 = 0.3;
    lmr_move_coeff: f64 = 0.25;
    lmr_depth_move_coeff: f64 = 0.08;
    aspiration_initial_width: i32 = 12;
    rfp_depth_limit: i32 = 8;
    fp_depth_limit: i32 = 8;
    see_depth_limit: i32 = 9;
    iir_depth_min: i32 = 4;
}

/// Precomputed `[depth][move_number]` LMR reduction table, per §4.H step
/// 12.h: a log-product formula baked into a table once at startup rather
/// than recomputed with `f64::ln` on every node.
pub struct LmrTable([[i32; 64]; 64]);

impl LmrTable {
    pub fn new() -> Self {
        let mut table = [[0i32; 64]; 64];
        for (depth, row) in table.iter_mut().enumerate() {
            for (move_number, cell) in row.iter_mut().enumerate() {
                let d = ((depth as f64) + 1.0).ln();
                let m = ((move_number as f64) + 1.0).ln();
                let r = sc::lmr_constant() + sc::lmr_depth_coeff() * d + sc::lmr_move_coeff() * m + sc::lmr_depth_move_coeff() * d * m;
                *cell = r.max(0.0).round() as i32;
            }
        }
        LmrTable(table)
    }

    pub fn reduction(&self, depth: i32, move_number: i32) -> i32 {
        let depth = depth.clamp(0, 63) as usize;
        let move_number = move_number.clamp(0, 63) as usize;
        self.0[depth][move_number]
    }
}

impl Default for LmrTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduction_grows_with_depth_and_move_number() {
        let table = LmrTable::new();
        assert!(table.reduction(20, 20) >= table.reduction(5, 5));
    }

    #[test]
    fn reduction_never_negative() {
        let table = LmrTable::new();
        for depth in 0..64 {
            for mv in 0..64 {
                assert!(table.reduction(depth, mv) >= 0);
            }
        }
    }
}
