// Floating point comparisons
pub const FEQ_EPSILON: f64 = 0.0001;

// Offset applied to secondary rays to avoid self-intersection
pub const RAY_EPSILON: f64 = 0.0001;

// Root-finding guards for the primitive solvers
pub const POLE_EPSILON: f64 = 1e-6;
pub const TUBE_EPSILON: f64 = 1e-12;
pub const CONE_LINEAR_EPSILON: f64 = 1e-6;

// Maximum recursion depth for reflected and refracted rays
pub const MAX_RECURSION_DEPTH: usize = 5;

// Output defaults
pub const DEFAULT_RESOLUTION: usize = 128;
pub const DEFAULT_OUT_FILE: &str = "out.ppm";
pub const DEFAULT_GAMMA: f64 = 2.4;

// Largest image the renderer will allocate, in pixels (8192 x 8192)
pub const MAX_PIXELS: usize = 1 << 26;

// Default material coefficients
pub const DEFAULT_AMBIENT: f64 = 0.2;
pub const DEFAULT_DIFFUSE: f64 = 0.8;

// Camera defaults
pub const DEFAULT_FOVY: f64 = 45.0;

// Common refraction indices
pub const VACUUM_RI: f64 = 1.0;
pub const GLASS_RI: f64 = 1.52;
