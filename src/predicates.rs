//! Exact geometric predicates: `left_of_plane`, `in_sphere`, `center_sphere`, `area`.
//!
//! Each orientation/incircle-style predicate follows the same two-stage shape: compute a fast
//! `f64` estimate together with an a-priori error bound (the "permanent"); if the estimate's
//! magnitude clears the bound, its sign is certainly correct and is returned directly; otherwise
//! the exact variant (built on [`crate::expansion`]) is invoked and its highest-magnitude
//! component carries the correctly-rounded sign. This module is a thin sign-normalizing wrapper
//! over that staging, not a numeric routine in its own right.

use crate::expansion::{
    expansion_sum_zeroelim_fast, scale_expansion_by_two_term, scale_expansion_zeroelim, two_diff,
    two_two_product, INSPHERE_ERRBOUND, O3D_ERRBOUND,
};
use crate::types::Vertex3;

/// Positive if `d` lies on the left (CCW) side of the oriented plane through `(a,b,c)`; negative
/// on the right; exactly zero if `d` is on the plane.
pub fn left_of_plane(a: Vertex3, b: Vertex3, c: Vertex3, d: Vertex3) -> f64 {
    let adx = a[0] - d[0];
    let bdx = b[0] - d[0];
    let cdx = c[0] - d[0];
    let ady = a[1] - d[1];
    let bdy = b[1] - d[1];
    let cdy = c[1] - d[1];
    let adz = a[2] - d[2];
    let bdz = b[2] - d[2];
    let cdz = c[2] - d[2];

    let bdxcdy = bdx * cdy;
    let cdxbdy = cdx * bdy;
    let cdxady = cdx * ady;
    let adxcdy = adx * cdy;
    let adxbdy = adx * bdy;
    let bdxady = bdx * ady;

    let det = adz * (bdxcdy - cdxbdy) - bdz * (adxcdy - cdxady) + cdz * (adxbdy - bdxady);

    let permanent = (bdxcdy.abs() + cdxbdy.abs()) * adz.abs()
        + (adxcdy.abs() + cdxady.abs()) * bdz.abs()
        + (adxbdy.abs() + bdxady.abs()) * cdz.abs();
    let errbound = *O3D_ERRBOUND * permanent;

    if det.abs() > errbound {
        return det;
    }
    left_of_plane_exact(a, b, c, d)
}

/// Full expansion-arithmetic fallback for [`left_of_plane`].
///
/// `adx,ady,adz,...` are captured as exact 2-term expansions via [`two_diff`] rather than plain
/// subtraction, so the translation by `d` itself introduces no rounding error. The three 2x2
/// minors of the translated `(b,c)` coordinates are formed with [`two_two_product`], combined into
/// the determinant's three cofactor terms by scaling each minor by the corresponding translated
/// `a`-coordinate (as a 2-term expansion), and summed. The sign of the final, zero-eliminated
/// expansion's highest-magnitude component is the answer (a valid nonoverlapping expansion cannot
/// have its sign flipped by lower-magnitude components).
fn left_of_plane_exact(a: Vertex3, b: Vertex3, c: Vertex3, d: Vertex3) -> f64 {
    let (adx_hi, adx_lo) = two_diff(a[0], d[0]);
    let (ady_hi, ady_lo) = two_diff(a[1], d[1]);
    let (adz_hi, adz_lo) = two_diff(a[2], d[2]);
    let (bdx_hi, bdx_lo) = two_diff(b[0], d[0]);
    let (bdy_hi, bdy_lo) = two_diff(b[1], d[1]);
    let (bdz_hi, bdz_lo) = two_diff(b[2], d[2]);
    let (cdx_hi, cdx_lo) = two_diff(c[0], d[0]);
    let (cdy_hi, cdy_lo) = two_diff(c[1], d[1]);
    let (cdz_hi, cdz_lo) = two_diff(c[2], d[2]);

    // m1 = bdy*cdz - bdz*cdy
    let p1 = two_two_product(bdy_hi, bdy_lo, cdz_hi, cdz_lo);
    let p2 = two_two_product(bdz_hi, bdz_lo, cdy_hi, cdy_lo);
    let neg_p2: [f64; 8] = p2.map(|v| -v);
    let mut m1 = [0.0; 16];
    let n_m1 = expansion_sum_zeroelim_fast(&p1, &neg_p2, &mut m1);

    // m2 = bdx*cdz - bdz*cdx
    let p3 = two_two_product(bdx_hi, bdx_lo, cdz_hi, cdz_lo);
    let p4 = two_two_product(bdz_hi, bdz_lo, cdx_hi, cdx_lo);
    let neg_p4: [f64; 8] = p4.map(|v| -v);
    let mut m2 = [0.0; 16];
    let n_m2 = expansion_sum_zeroelim_fast(&p3, &neg_p4, &mut m2);

    // m3 = bdx*cdy - bdy*cdx
    let p5 = two_two_product(bdx_hi, bdx_lo, cdy_hi, cdy_lo);
    let p6 = two_two_product(bdy_hi, bdy_lo, cdx_hi, cdx_lo);
    let neg_p6: [f64; 8] = p6.map(|v| -v);
    let mut m3 = [0.0; 16];
    let n_m3 = expansion_sum_zeroelim_fast(&p5, &neg_p6, &mut m3);

    // term_a = adx * m1, term_b = ady * m2, term_c = adz * m3 (each an expansion scaled by a
    // 2-term expansion).
    let mut scratch_hi = [0.0; 32];
    let mut scratch_lo = [0.0; 32];
    let mut term_a = [0.0; 64];
    let n_a = scale_expansion_by_two_term(
        &m1[..n_m1],
        adx_hi,
        adx_lo,
        &mut scratch_hi,
        &mut scratch_lo,
        &mut term_a,
    );
    let mut term_b = [0.0; 64];
    let n_b = scale_expansion_by_two_term(
        &m2[..n_m2],
        ady_hi,
        ady_lo,
        &mut scratch_hi,
        &mut scratch_lo,
        &mut term_b,
    );
    let mut term_c = [0.0; 64];
    let n_c = scale_expansion_by_two_term(
        &m3[..n_m3],
        adz_hi,
        adz_lo,
        &mut scratch_hi,
        &mut scratch_lo,
        &mut term_c,
    );

    // det = term_a - term_b + term_c
    let neg_term_b: Vec<f64> = term_b[..n_b].iter().map(|v| -v).collect();
    let mut sum1 = [0.0; 128];
    let n_sum1 = expansion_sum_zeroelim_fast(&term_a[..n_a], &neg_term_b, &mut sum1);
    let mut fin = [0.0; 192];
    let n_fin = expansion_sum_zeroelim_fast(&sum1[..n_sum1], &term_c[..n_c], &mut fin);

    if n_fin == 0 {
        0.0
    } else {
        fin[n_fin - 1]
    }
}

/// Positive if `e` is strictly inside the sphere through `(a,b,c,d)`; negative if strictly
/// outside; exactly zero if `e` lies on the sphere. Assumes `left_of_plane(a,b,c,d) > 0`.
pub fn in_sphere(a: Vertex3, b: Vertex3, c: Vertex3, d: Vertex3, e: Vertex3) -> f64 {
    let aex = a[0] - e[0];
    let bex = b[0] - e[0];
    let cex = c[0] - e[0];
    let dex = d[0] - e[0];
    let aey = a[1] - e[1];
    let bey = b[1] - e[1];
    let cey = c[1] - e[1];
    let dey = d[1] - e[1];
    let aez = a[2] - e[2];
    let bez = b[2] - e[2];
    let cez = c[2] - e[2];
    let dez = d[2] - e[2];

    let ab = aex * bey - bex * aey;
    let bc = bex * cey - cex * bey;
    let cd = cex * dey - dex * cey;
    let da = dex * aey - aex * dey;
    let ac = aex * cey - cex * aey;
    let bd = bex * dey - dex * bey;

    let abc = aez * bc - bez * ac + cez * ab;
    let bcd = bez * cd - cez * bd + dez * bc;
    let cda = cez * da + dez * ac + aez * cd;
    let dab = dez * ab + aez * bd + bez * da;

    let alift = aex * aex + aey * aey + aez * aez;
    let blift = bex * bex + bey * bey + bez * bez;
    let clift = cex * cex + cey * cey + cez * cez;
    let dlift = dex * dex + dey * dey + dez * dez;

    let det = dlift * abc - clift * dab + blift * cda - alift * bcd;

    // The permanent sums the absolute value of each product term feeding `det`, bounding the
    // worst-case roundoff of the whole expression.
    let permanent = (aez.abs() * bc.abs() + bez.abs() * ac.abs() + cez.abs() * ab.abs()) * dlift.abs()
        + (bez.abs() * cd.abs() + cez.abs() * bd.abs() + dez.abs() * bc.abs()) * clift.abs()
        + (cez.abs() * da.abs() + dez.abs() * ac.abs() + aez.abs() * cd.abs()) * blift.abs()
        + (dez.abs() * ab.abs() + aez.abs() * bd.abs() + bez.abs() * da.abs()) * alift.abs();
    let errbound = *INSPHERE_ERRBOUND * permanent;

    if det.abs() > errbound {
        return det;
    }
    in_sphere_exact(a, b, c, d, e)
}

/// Full expansion-arithmetic fallback for [`in_sphere`].
///
/// Builds the six 2x2 minors `(ab,bc,cd,da,ac,bd)` of the translated `(x,y)` coordinates as
/// expansions via [`two_two_product`], combines them (scaled by the translated `z` coordinates,
/// head and tail) into the four signed triple products `abc,bcd,cda,dab`, then scales each by the
/// corresponding lifted term (`x^2+y^2+z^2`, itself expanded exactly) and sums. As with
/// [`left_of_plane_exact`], the sign of the final zero-eliminated expansion's highest-magnitude
/// component is the answer.
fn in_sphere_exact(a: Vertex3, b: Vertex3, c: Vertex3, d: Vertex3, e: Vertex3) -> f64 {
    let (aex_hi, aex_lo) = two_diff(a[0], e[0]);
    let (aey_hi, aey_lo) = two_diff(a[1], e[1]);
    let (aez_hi, aez_lo) = two_diff(a[2], e[2]);
    let (bex_hi, bex_lo) = two_diff(b[0], e[0]);
    let (bey_hi, bey_lo) = two_diff(b[1], e[1]);
    let (bez_hi, bez_lo) = two_diff(b[2], e[2]);
    let (cex_hi, cex_lo) = two_diff(c[0], e[0]);
    let (cey_hi, cey_lo) = two_diff(c[1], e[1]);
    let (cez_hi, cez_lo) = two_diff(c[2], e[2]);
    let (dex_hi, dex_lo) = two_diff(d[0], e[0]);
    let (dey_hi, dey_lo) = two_diff(d[1], e[1]);
    let (dez_hi, dez_lo) = two_diff(d[2], e[2]);

    // six 2x2 minors of the translated (x,y) coordinates, each an (up to) 8-term expansion.
    let minor = |p1x_hi: f64,
                 p1x_lo: f64,
                 p1y_hi: f64,
                 p1y_lo: f64,
                 p2x_hi: f64,
                 p2x_lo: f64,
                 p2y_hi: f64,
                 p2y_lo: f64|
     -> ([f64; 16], usize) {
        let p = two_two_product(p1x_hi, p1x_lo, p2y_hi, p2y_lo);
        let q = two_two_product(p2x_hi, p2x_lo, p1y_hi, p1y_lo);
        let neg_q: [f64; 8] = q.map(|v| -v);
        let mut out = [0.0; 16];
        let n = expansion_sum_zeroelim_fast(&p, &neg_q, &mut out);
        (out, n)
    };

    let (ab, n_ab) = minor(
        aex_hi, aex_lo, aey_hi, aey_lo, bex_hi, bex_lo, bey_hi, bey_lo,
    );
    let (bc, n_bc) = minor(
        bex_hi, bex_lo, bey_hi, bey_lo, cex_hi, cex_lo, cey_hi, cey_lo,
    );
    let (cd, n_cd) = minor(
        cex_hi, cex_lo, cey_hi, cey_lo, dex_hi, dex_lo, dey_hi, dey_lo,
    );
    let (da, n_da) = minor(
        dex_hi, dex_lo, dey_hi, dey_lo, aex_hi, aex_lo, aey_hi, aey_lo,
    );
    let (ac, n_ac) = minor(
        aex_hi, aex_lo, aey_hi, aey_lo, cex_hi, cex_lo, cey_hi, cey_lo,
    );
    let (bd, n_bd) = minor(
        bex_hi, bex_lo, bey_hi, bey_lo, dex_hi, dex_lo, dey_hi, dey_lo,
    );

    // triple products abc = az*bc - bz*ac + cz*ab, and cyclically for bcd, cda, dab.
    let triple = |s1: (&[f64], f64, f64),
                  s2: (&[f64], f64, f64),
                  s3: (&[f64], f64, f64)|
     -> ([f64; 192], usize) {
        let mut scratch_hi = [0.0; 32];
        let mut scratch_lo = [0.0; 32];
        let mut t1 = [0.0; 64];
        let n1 = scale_expansion_by_two_term(s1.0, s1.1, s1.2, &mut scratch_hi, &mut scratch_lo, &mut t1);
        let mut t2 = [0.0; 64];
        let n2 = scale_expansion_by_two_term(s2.0, s2.1, s2.2, &mut scratch_hi, &mut scratch_lo, &mut t2);
        let mut t3 = [0.0; 64];
        let n3 = scale_expansion_by_two_term(s3.0, s3.1, s3.2, &mut scratch_hi, &mut scratch_lo, &mut t3);

        let mut sum1 = [0.0; 128];
        let n_sum1 = expansion_sum_zeroelim_fast(&t1[..n1], &t2[..n2], &mut sum1);
        let mut out = [0.0; 192];
        let n_out = expansion_sum_zeroelim_fast(&sum1[..n_sum1], &t3[..n3], &mut out);
        (out, n_out)
    };

    let (abc, n_abc) = triple(
        (&bc[..n_bc], aez_hi, aez_lo),
        (&ac[..n_ac], -bez_hi, -bez_lo),
        (&ab[..n_ab], cez_hi, cez_lo),
    );
    let (bcd, n_bcd) = triple(
        (&cd[..n_cd], bez_hi, bez_lo),
        (&bd[..n_bd], -cez_hi, -cez_lo),
        (&bc[..n_bc], dez_hi, dez_lo),
    );
    let (cda, n_cda) = triple(
        (&da[..n_da], cez_hi, cez_lo),
        (&ac[..n_ac], dez_hi, dez_lo),
        (&cd[..n_cd], aez_hi, aez_lo),
    );
    let (dab, n_dab) = triple(
        (&ab[..n_ab], dez_hi, dez_lo),
        (&bd[..n_bd], aez_hi, aez_lo),
        (&da[..n_da], bez_hi, bez_lo),
    );

    // lifted terms x^2+y^2+z^2, expanded exactly via two_product/expansion sums.
    let lift = |x_hi: f64, x_lo: f64, y_hi: f64, y_lo: f64, z_hi: f64, z_lo: f64| -> ([f64; 32], usize) {
        let xx = two_two_product(x_hi, x_lo, x_hi, x_lo);
        let yy = two_two_product(y_hi, y_lo, y_hi, y_lo);
        let zz = two_two_product(z_hi, z_lo, z_hi, z_lo);
        let mut xy = [0.0; 16];
        let n_xy = expansion_sum_zeroelim_fast(&xx, &yy, &mut xy);
        let mut out = [0.0; 32];
        let n = expansion_sum_zeroelim_fast(&xy[..n_xy], &zz, &mut out);
        (out, n)
    };

    let (alift, n_alift) = lift(aex_hi, aex_lo, aey_hi, aey_lo, aez_hi, aez_lo);
    let (blift, n_blift) = lift(bex_hi, bex_lo, bey_hi, bey_lo, bez_hi, bez_lo);
    let (clift, n_clift) = lift(cex_hi, cex_lo, cey_hi, cey_lo, cez_hi, cez_lo);
    let (dlift, n_dlift) = lift(dex_hi, dex_lo, dey_hi, dey_lo, dez_hi, dez_lo);

    // det = dlift*abc - clift*dab + blift*cda - alift*bcd, each product an expansion-times-
    // expansion scale via repeated scale_expansion_zeroelim over the lift's components.
    let scale_by_lift = |e: &[f64], lift: &[f64]| -> Vec<f64> {
        let mut acc: Vec<f64> = vec![0.0];
        let mut acc_len = 0usize;
        for &l in lift {
            let mut scaled = vec![0.0; 2 * e.len().max(1)];
            let n = scale_expansion_zeroelim(e, l, &mut scaled);
            let mut merged = vec![0.0; acc_len + n];
            let n_merged = expansion_sum_zeroelim_fast(&acc[..acc_len], &scaled[..n], &mut merged);
            acc = merged;
            acc_len = n_merged;
        }
        acc.truncate(acc_len);
        acc
    };

    let t_dlift_abc = scale_by_lift(&abc[..n_abc], &dlift[..n_dlift]);
    let t_clift_dab = scale_by_lift(&dab[..n_dab], &clift[..n_clift]);
    let t_blift_cda = scale_by_lift(&cda[..n_cda], &blift[..n_blift]);
    let t_alift_bcd = scale_by_lift(&bcd[..n_bcd], &alift[..n_alift]);

    let neg_clift_dab: Vec<f64> = t_clift_dab.iter().map(|v| -v).collect();
    let neg_alift_bcd: Vec<f64> = t_alift_bcd.iter().map(|v| -v).collect();

    let mut s1 = vec![0.0; t_dlift_abc.len() + neg_clift_dab.len()];
    let n_s1 = expansion_sum_zeroelim_fast(&t_dlift_abc, &neg_clift_dab, &mut s1);
    let mut s2 = vec![0.0; n_s1 + t_blift_cda.len()];
    let n_s2 = expansion_sum_zeroelim_fast(&s1[..n_s1], &t_blift_cda, &mut s2);
    let mut s3 = vec![0.0; n_s2 + neg_alift_bcd.len()];
    let n_s3 = expansion_sum_zeroelim_fast(&s2[..n_s2], &neg_alift_bcd, &mut s3);

    if n_s3 == 0 {
        0.0
    } else {
        s3[n_s3 - 1]
    }
}

/// Circumcenter of the sphere through `(a,b,c,d)`. Non-exact (a numerical estimate), defined only
/// when `left_of_plane(a,b,c,d) != 0`; assumes the caller has already ensured the four points are
/// in CCW order (`left_of_plane(a,b,c,d) > 0`).
pub fn center_sphere(a: Vertex3, b: Vertex3, c: Vertex3, d: Vertex3) -> Vertex3 {
    let adx = a[0] - d[0];
    let bdx = b[0] - d[0];
    let cdx = c[0] - d[0];
    let ady = a[1] - d[1];
    let bdy = b[1] - d[1];
    let cdy = c[1] - d[1];
    let adz = a[2] - d[2];
    let bdz = b[2] - d[2];
    let cdz = c[2] - d[2];

    let ads = adx * adx + ady * ady + adz * adz;
    let bds = bdx * bdx + bdy * bdy + bdz * bdz;
    let cds = cdx * cdx + cdy * cdy + cdz * cdz;

    let denom = left_of_plane(a, b, c, d);
    let scale = 0.5 / denom;

    let cx = d[0]
        + scale
            * (ads * (bdy * cdz - cdy * bdz) + bds * (cdy * adz - ady * cdz)
                + cds * (ady * bdz - bdy * adz));
    let cy = d[1]
        + scale
            * (ads * (cdx * bdz - bdx * cdz) + bds * (adx * cdz - cdx * adz)
                + cds * (bdx * adz - adx * bdz));
    let cz = d[2]
        + scale
            * (ads * (bdx * cdy - cdx * bdy) + bds * (cdx * ady - adx * cdy)
                + cds * (adx * bdy - bdx * ady));

    [cx, cy, cz]
}

/// Nonnegative area of triangle `(a,b,c)`: half the norm of `(b-a) x (c-a)`.
pub fn area(a: Vertex3, b: Vertex3, c: Vertex3) -> f64 {
    let ab = crate::types::sub(b, a);
    let ac = crate::types::sub(c, a);
    0.5 * crate::types::norm(crate::types::cross(ab, ac))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_of_plane_sign_convention() {
        let a = [0.0, 0.0, 0.0];
        let b = [1.0, 0.0, 0.0];
        let c = [0.0, 1.0, 0.0];
        let above = [0.0, 0.0, -1.0];
        let below = [0.0, 0.0, 1.0];
        assert!(left_of_plane(a, b, c, above) > 0.0);
        assert!(left_of_plane(a, b, c, below) < 0.0);
    }

    #[test]
    fn left_of_plane_coplanar_is_exactly_zero() {
        let a = [0.0, 0.0, 0.0];
        let b = [1.0, 0.0, 0.0];
        let c = [0.0, 1.0, 0.0];
        let d = [2.0, 3.0, 0.0];
        assert_eq!(left_of_plane(a, b, c, d), 0.0);
    }

    #[test]
    fn left_of_plane_antisymmetric_under_swap() {
        let a = [0.3, 0.1, 0.2];
        let b = [1.0, 0.0, 0.0];
        let c = [0.0, 1.0, 0.0];
        let d = [0.2, 0.2, 1.0];
        let v1 = left_of_plane(a, b, c, d);
        let v2 = left_of_plane(b, a, c, d);
        assert!(v1 * v2 < 0.0 || (v1 == 0.0 && v2 == 0.0));
    }

    #[test]
    fn in_sphere_center_is_on_boundary() {
        let a = [1.0, 1.0, 1.0];
        let b = [1.0, -1.0, -1.0];
        let c = [-1.0, 1.0, -1.0];
        let d = [-1.0, -1.0, 1.0];
        assert!(left_of_plane(a, b, c, d) > 0.0);
        let center = center_sphere(a, b, c, d);
        let val = in_sphere(a, b, c, d, center);
        assert!(val.abs() < 1e-6);
    }

    #[test]
    fn in_sphere_far_point_is_outside() {
        let a = [1.0, 1.0, 1.0];
        let b = [1.0, -1.0, -1.0];
        let c = [-1.0, 1.0, -1.0];
        let d = [-1.0, -1.0, 1.0];
        let far = [100.0, 100.0, 100.0];
        assert!(in_sphere(a, b, c, d, far) < 0.0);
    }

    #[test]
    fn area_of_right_triangle() {
        let a = [0.0, 0.0, 0.0];
        let b = [2.0, 0.0, 0.0];
        let c = [0.0, 3.0, 0.0];
        assert!((area(a, b, c) - 3.0).abs() < 1e-12);
    }
}
