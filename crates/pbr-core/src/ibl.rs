//! CPU reference for the image-based-lighting integrals
//!
//! These functions mirror the WGSL precomputation shaders one to one. They
//! are used to verify baked textures after readback and to pin down the
//! expected behavior in tests.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::{Vec2, Vec3};

/// Van der Corput radical inverse in base 2
pub fn radical_inverse_vdc(mut bits: u32) -> f32 {
    bits = bits.rotate_left(16);
    bits = ((bits & 0x5555_5555) << 1) | ((bits & 0xAAAA_AAAA) >> 1);
    bits = ((bits & 0x3333_3333) << 2) | ((bits & 0xCCCC_CCCC) >> 2);
    bits = ((bits & 0x0F0F_0F0F) << 4) | ((bits & 0xF0F0_F0F0) >> 4);
    bits = ((bits & 0x00FF_00FF) << 8) | ((bits & 0xFF00_FF00) >> 8);
    bits as f32 * 2.328_306_4e-10
}

/// Point `i` of an `n`-point Hammersley set
pub fn hammersley(i: u32, n: u32) -> Vec2 {
    Vec2::new(i as f32 / n as f32, radical_inverse_vdc(i))
}

/// GGX half vector around `n` for the quasi-random pair `xi`
pub fn importance_sample_ggx(xi: Vec2, n: Vec3, roughness: f32) -> Vec3 {
    let a = roughness * roughness;

    let phi = TAU * xi.x;
    let cos_theta = ((1.0 - xi.y) / (1.0 + (a * a - 1.0) * xi.y)).sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();

    let h = Vec3::new(phi.cos() * sin_theta, phi.sin() * sin_theta, cos_theta);
    tangent_to_world(h, n)
}

/// Rotate a tangent-space vector into the frame around `n`
pub fn tangent_to_world(v: Vec3, n: Vec3) -> Vec3 {
    let up = if n.z.abs() < 0.999 { Vec3::Z } else { Vec3::X };
    let tangent = up.cross(n).normalize();
    let bitangent = n.cross(tangent);
    (tangent * v.x + bitangent * v.y + n * v.z).normalize()
}

/// Schlick-GGX masking with the IBL remapping `k = a^2 / 2`
pub fn geometry_schlick_ggx(n_dot_v: f32, roughness: f32) -> f32 {
    let a = roughness;
    let k = (a * a) / 2.0;
    n_dot_v / (n_dot_v * (1.0 - k) + k)
}

/// Separable Smith shadowing-masking
pub fn geometry_smith(n_dot_v: f32, n_dot_l: f32, roughness: f32) -> f32 {
    geometry_schlick_ggx(n_dot_v, roughness) * geometry_schlick_ggx(n_dot_l, roughness)
}

/// Split-sum BRDF integral: returns (scale, bias) applied to F0
pub fn integrate_brdf(n_dot_v: f32, roughness: f32, samples: u32) -> Vec2 {
    let v = Vec3::new((1.0 - n_dot_v * n_dot_v).max(0.0).sqrt(), 0.0, n_dot_v);
    let n = Vec3::Z;

    let mut a = 0.0;
    let mut b = 0.0;
    for i in 0..samples {
        let xi = hammersley(i, samples);
        let h = importance_sample_ggx(xi, n, roughness);
        let l = (2.0 * v.dot(h) * h - v).normalize();

        let n_dot_l = l.z.max(0.0);
        let n_dot_h = h.z.max(0.0);
        let v_dot_h = v.dot(h).max(0.0);

        if n_dot_l > 0.0 {
            let g = geometry_smith(n_dot_v, n_dot_l, roughness);
            let g_vis = (g * v_dot_h) / (n_dot_h * n_dot_v);
            let fc = (1.0 - v_dot_h).powi(5);

            a += (1.0 - fc) * g_vis;
            b += fc * g_vis;
        }
    }
    Vec2::new(a, b) / samples as f32
}

/// Texture coordinate of `dir` in an equirectangular map (v = 0 at the bottom)
pub fn direction_to_equirect_uv(dir: Vec3) -> Vec2 {
    let dir = dir.normalize();
    Vec2::new(
        dir.z.atan2(dir.x) / TAU + 0.5,
        dir.y.clamp(-1.0, 1.0).asin() / PI + 0.5,
    )
}

/// Inverse of [`direction_to_equirect_uv`]
pub fn equirect_uv_to_direction(uv: Vec2) -> Vec3 {
    let phi = (uv.x - 0.5) * TAU;
    let theta = (uv.y - 0.5) * PI;
    Vec3::new(theta.cos() * phi.cos(), theta.sin(), theta.cos() * phi.sin())
}

/// Cosine-weighted hemisphere convolution around `normal`
///
/// Riemann sum over a (phi, theta) grid with step `delta`, normalized so that a
/// constant environment of radiance C convolves to C.
pub fn convolve_irradiance(radiance: impl Fn(Vec3) -> Vec3, normal: Vec3, delta: f32) -> Vec3 {
    let n = normal.normalize();
    let mut sum = Vec3::ZERO;
    let mut count = 0u32;

    let mut phi = 0.0;
    while phi < TAU {
        let mut theta = 0.0;
        while theta < FRAC_PI_2 {
            let tangent = Vec3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos());
            let sample = tangent_to_world(tangent, n);
            sum += radiance(sample) * theta.cos() * theta.sin();
            count += 1;
            theta += delta;
        }
        phi += delta;
    }
    PI * sum / count.max(1) as f32
}
