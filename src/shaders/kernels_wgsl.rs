//! WGSL shader source code for the matrix kernels
//!
//! Every module declares the `WG_X` / `WG_Y` override constants used as its
//! workgroup shape. Bindings are ordered read-only inputs, then the output,
//! then the uniform parameter block.

/// Elementwise addition: `out = a + b`
pub const MAT_ADD_SHADER: &str = r#"
override WG_X: u32 = 64u;
override WG_Y: u32 = 1u;

struct ElementwiseParams {
    numel: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

@group(0) @binding(0) var<storage, read> add_a: array<f32>;
@group(0) @binding(1) var<storage, read> add_b: array<f32>;
@group(0) @binding(2) var<storage, read_write> add_out: array<f32>;
@group(0) @binding(3) var<uniform> add_params: ElementwiseParams;

@compute @workgroup_size(WG_X, WG_Y, 1)
fn matAddSimple(@builtin(global_invocation_id) gid: vec3<u32>,
                @builtin(num_workgroups) groups: vec3<u32>) {
    let idx = gid.y * groups.x * WG_X + gid.x;
    if (idx >= add_params.numel) {
        return;
    }
    add_out[idx] = add_a[idx] + add_b[idx];
}
"#;

/// Scalar multiplication: `out = a * scalar`
pub const MAT_SCALAR_SHADER: &str = r#"
override WG_X: u32 = 64u;
override WG_Y: u32 = 1u;

struct ScalarParams {
    numel: u32,
    scalar: f32,
    _pad0: u32,
    _pad1: u32,
}

@group(0) @binding(0) var<storage, read> scalar_a: array<f32>;
@group(0) @binding(1) var<storage, read_write> scalar_out: array<f32>;
@group(0) @binding(2) var<uniform> scalar_params: ScalarParams;

@compute @workgroup_size(WG_X, WG_Y, 1)
fn matMultScalar(@builtin(global_invocation_id) gid: vec3<u32>,
                 @builtin(num_workgroups) groups: vec3<u32>) {
    let idx = gid.y * groups.x * WG_X + gid.x;
    if (idx >= scalar_params.numel) {
        return;
    }
    scalar_out[idx] = scalar_a[idx] * scalar_params.scalar;
}
"#;

/// Matrix product over a 2-D grid: one thread per output element
pub const MAT_MULT_SHADER: &str = r#"
override WG_X: u32 = 16u;
override WG_Y: u32 = 16u;

struct MatmulParams {
    a_width: u32,     // == rows of B
    b_width: u32,     // == columns of the output
    out_height: u32,  // == rows of A
    _pad0: u32,
}

@group(0) @binding(0) var<storage, read> matmul_a: array<f32>;
@group(0) @binding(1) var<storage, read> matmul_b: array<f32>;
@group(0) @binding(2) var<storage, read_write> matmul_out: array<f32>;
@group(0) @binding(3) var<uniform> matmul_params: MatmulParams;

@compute @workgroup_size(WG_X, WG_Y, 1)
fn matMultSimple(@builtin(global_invocation_id) gid: vec3<u32>) {
    let col = gid.x;
    let row = gid.y;
    let inner = matmul_params.a_width;
    let out_width = matmul_params.b_width;
    if (col >= out_width || row >= matmul_params.out_height) {
        return;
    }

    var sum: f32 = 0.0;
    for (var k: u32 = 0u; k < inner; k = k + 1u) {
        sum = sum + matmul_a[row * inner + k] * matmul_b[k * out_width + col];
    }
    matmul_out[row * out_width + col] = sum;
}
"#;

/// Every element of a batch multiplied against one matrix, on either side.
///
/// `matMultMultiRight` computes `out[i] = a[i] * b`,
/// `matMultMultiLeft` computes `out[i] = b * a[i]`.
pub const MAT_MULT_BATCH_SHADER: &str = r#"
override WG_X: u32 = 64u;
override WG_Y: u32 = 1u;

struct BatchParams {
    a_width: u32,
    a_height: u32,
    b_width: u32,
    b_height: u32,
    out_width: u32,
    out_height: u32,
    count: u32,
    _pad0: u32,
}

@group(0) @binding(0) var<storage, read> batch_a: array<f32>;
@group(0) @binding(1) var<storage, read> batch_b: array<f32>;
@group(0) @binding(2) var<storage, read_write> batch_out: array<f32>;
@group(0) @binding(3) var<uniform> batch_params: BatchParams;

@compute @workgroup_size(WG_X, WG_Y, 1)
fn matMultMultiRight(@builtin(global_invocation_id) gid: vec3<u32>,
                     @builtin(num_workgroups) groups: vec3<u32>) {
    let idx = gid.y * groups.x * WG_X + gid.x;
    let per_matrix = batch_params.out_width * batch_params.out_height;
    if (idx >= per_matrix * batch_params.count) {
        return;
    }

    let element = idx / per_matrix;
    let local = idx % per_matrix;
    let row = local / batch_params.out_width;
    let col = local % batch_params.out_width;
    let a_base = element * batch_params.a_width * batch_params.a_height;

    var sum: f32 = 0.0;
    for (var k: u32 = 0u; k < batch_params.a_width; k = k + 1u) {
        sum = sum + batch_a[a_base + row * batch_params.a_width + k]
                  * batch_b[k * batch_params.b_width + col];
    }
    batch_out[idx] = sum;
}

@compute @workgroup_size(WG_X, WG_Y, 1)
fn matMultMultiLeft(@builtin(global_invocation_id) gid: vec3<u32>,
                    @builtin(num_workgroups) groups: vec3<u32>) {
    let idx = gid.y * groups.x * WG_X + gid.x;
    let per_matrix = batch_params.out_width * batch_params.out_height;
    if (idx >= per_matrix * batch_params.count) {
        return;
    }

    let element = idx / per_matrix;
    let local = idx % per_matrix;
    let row = local / batch_params.out_width;
    let col = local % batch_params.out_width;
    let a_base = element * batch_params.a_width * batch_params.a_height;

    var sum: f32 = 0.0;
    for (var k: u32 = 0u; k < batch_params.b_width; k = k + 1u) {
        sum = sum + batch_b[row * batch_params.b_width + k]
                  * batch_a[a_base + k * batch_params.a_width + col];
    }
    batch_out[idx] = sum;
}
"#;

/// Uniform pseudo-random fill in [0, 1), seeded through the `seed` override
pub const FILL_RANDOM_SHADER: &str = r#"
override WG_X: u32 = 64u;
override WG_Y: u32 = 1u;
override seed: i32 = 0;

struct RandomParams {
    numel: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

@group(0) @binding(0) var<storage, read_write> random_out: array<f32>;
@group(0) @binding(1) var<uniform> random_params: RandomParams;

// PCG hash (O'Neill), one round per call
fn pcg_hash(input: u32) -> u32 {
    let state = input * 747796405u + 2891336453u;
    let word = ((state >> ((state >> 28u) + 4u)) ^ state) * 277803737u;
    return (word >> 22u) ^ word;
}

@compute @workgroup_size(WG_X, WG_Y, 1)
fn fillRandom(@builtin(global_invocation_id) gid: vec3<u32>,
              @builtin(num_workgroups) groups: vec3<u32>) {
    let idx = gid.y * groups.x * WG_X + gid.x;
    if (idx >= random_params.numel) {
        return;
    }
    let bits = pcg_hash(idx + pcg_hash(bitcast<u32>(seed)));
    // 24 high bits -> [0, 1)
    random_out[idx] = f32(bits >> 8u) / 16777216.0;
}
"#;

/// Debug text rendering.
///
/// Each element owns a 14-byte slot: a 13-character right-aligned field and
/// one separator (space, newline at row ends, left zero after the last
/// element so the buffer reads as a C string). Fields hold `%.4f` for
/// magnitudes below 1e6 and `d.dddde+XX` above. The text buffer must be
/// zero-initialized.
pub const GENERATE_STRING_SHADER: &str = r#"
override WG_X: u32 = 64u;
override WG_Y: u32 = 1u;

const SLOT: u32 = 14u;
const FIELD: u32 = 13u;
const FIXED_LIMIT: f32 = 1000000.0;

struct TextParams {
    width: u32,
    numel: u32,
    _pad0: u32,
    _pad1: u32,
}

@group(0) @binding(0) var<storage, read> text_mat: array<f32>;
@group(0) @binding(1) var<storage, read_write> text_out: array<atomic<u32>>;
@group(0) @binding(2) var<uniform> text_params: TextParams;

// Bytes of neighbouring slots share words
fn put(pos: u32, ch: u32) {
    atomicOr(&text_out[pos >> 2u], (ch & 0xffu) << ((pos & 3u) * 8u));
}

@compute @workgroup_size(WG_X, WG_Y, 1)
fn generateString(@builtin(global_invocation_id) gid: vec3<u32>,
                  @builtin(num_workgroups) groups: vec3<u32>) {
    let idx = gid.y * groups.x * WG_X + gid.x;
    if (idx >= text_params.numel) {
        return;
    }

    let base = idx * SLOT;
    let v = text_mat[idx];
    let bits = bitcast<u32>(v);
    let negative = (bits >> 31u) != 0u;
    // Written right to left
    var cursor = base + FIELD;

    if (((bits >> 23u) & 0xffu) == 0xffu) {
        if ((bits & 0x7fffffu) != 0u) {
            cursor -= 1u; put(cursor, 110u);
            cursor -= 1u; put(cursor, 97u);
            cursor -= 1u; put(cursor, 110u);
        } else {
            cursor -= 1u; put(cursor, 102u);
            cursor -= 1u; put(cursor, 110u);
            cursor -= 1u; put(cursor, 105u);
            if (negative) {
                cursor -= 1u; put(cursor, 45u);
            }
        }
    } else {
        let mag = abs(v);
        if (mag < FIXED_LIMIT) {
            var whole = u32(floor(mag));
            var frac = u32(round((mag - floor(mag)) * 10000.0));
            if (frac >= 10000u) {
                frac -= 10000u;
                whole += 1u;
            }
            let nonzero = whole != 0u || frac != 0u;
            for (var i: u32 = 0u; i < 4u; i = i + 1u) {
                cursor -= 1u; put(cursor, 48u + frac % 10u);
                frac /= 10u;
            }
            cursor -= 1u; put(cursor, 46u);
            loop {
                cursor -= 1u; put(cursor, 48u + whole % 10u);
                whole /= 10u;
                if (whole == 0u) {
                    break;
                }
            }
            if (negative && nonzero) {
                cursor -= 1u; put(cursor, 45u);
            }
        } else {
            var exponent = i32(floor(log(mag) / log(10.0)));
            var mantissa = mag / pow(10.0, f32(exponent));
            if (mantissa >= 10.0) {
                mantissa /= 10.0;
                exponent += 1;
            }
            if (mantissa < 1.0) {
                mantissa *= 10.0;
                exponent -= 1;
            }
            var digits = u32(round(mantissa * 10000.0));
            if (digits >= 100000u) {
                digits = 10000u;
                exponent += 1;
            }
            let e = u32(exponent);
            cursor -= 1u; put(cursor, 48u + e % 10u);
            cursor -= 1u; put(cursor, 48u + (e / 10u) % 10u);
            cursor -= 1u; put(cursor, 43u);
            cursor -= 1u; put(cursor, 101u);
            for (var i: u32 = 0u; i < 4u; i = i + 1u) {
                cursor -= 1u; put(cursor, 48u + digits % 10u);
                digits /= 10u;
            }
            cursor -= 1u; put(cursor, 46u);
            cursor -= 1u; put(cursor, 48u + digits % 10u);
            if (negative) {
                cursor -= 1u; put(cursor, 45u);
            }
        }
    }

    for (var p: u32 = base; p < cursor; p = p + 1u) {
        put(p, 32u);
    }

    if (idx + 1u < text_params.numel) {
        if ((idx + 1u) % text_params.width == 0u) {
            put(base + FIELD, 10u);
        } else {
            put(base + FIELD, 32u);
        }
    }
}
"#;
