/// Implements the standard arithmetic operator traits for single-field newtypes.
///
/// * `op!(binary T, Add, add)` implements `T + T -> T`
/// * `op!(inplace T, SubAssign, sub_assign)` implements `T -= T`
/// * `op!(unary T, Neg, neg)` implements `-T`
#[macro_export]
macro_rules! op {
    (binary $type:ty, $trt:ident, $fn:ident) => {
        impl std::ops::$trt for $type {
            type Output = Self;

            fn $fn(self, rhs: Self) -> Self::Output {
                Self::from(std::ops::$trt::$fn(self.value(), rhs.value()))
            }
        }
    };
    (inplace $type:ty, $trt:ident, $fn:ident) => {
        impl std::ops::$trt for $type {
            fn $fn(&mut self, rhs: Self) {
                std::ops::$trt::$fn(&mut self.0, rhs.0)
            }
        }
    };
    (unary $type:ty, $trt:ident, $fn:ident) => {
        impl std::ops::$trt for $type {
            type Output = Self;

            fn $fn(self) -> Self::Output {
                Self::from(std::ops::$trt::$fn(self.value()))
            }
        }
    };
}
