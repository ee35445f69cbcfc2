/// Implements an arithmetic trait for a single-field tuple struct by delegating to the inner value.
///
/// `op!(binary Money, Add, add)` expands to the `Add` impl that [`Money`](crate::Money) and any other minor-unit
/// newtype share, without hand-writing the forwarding boilerplate per trait.
#[macro_export]
macro_rules! op {
    (binary $for_struct:ident, $impl_trait:ident, $impl_fn:ident) => {
        impl $impl_trait for $for_struct {
            type Output = Self;

            fn $impl_fn(self, rhs: Self) -> Self::Output {
                Self(self.0.$impl_fn(rhs.0))
            }
        }
    };

    (inplace $for_struct:ident, $impl_trait:ident, $impl_fn:ident) => {
        impl $impl_trait for $for_struct {
            fn $impl_fn(&mut self, rhs: Self) {
                self.0.$impl_fn(rhs.0)
            }
        }
    };

    (unary $for_struct:ident, $impl_trait:ident, $impl_fn:ident) => {
        impl $impl_trait for $for_struct {
            type Output = Self;

            fn $impl_fn(self) -> Self::Output {
                Self(self.0.$impl_fn())
            }
        }
    };
}

#[cfg(test)]
mod test {
    use std::ops::{Add, AddAssign, Neg};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Units(i64);

    crate::op!(binary Units, Add, add);
    crate::op!(inplace Units, AddAssign, add_assign);
    crate::op!(unary Units, Neg, neg);

    #[test]
    fn generated_operators_delegate_to_the_inner_value() {
        let mut stock = Units(4) + Units(6);
        assert_eq!(stock, Units(10));
        stock += Units(5);
        assert_eq!(stock, Units(15));
        assert_eq!(-stock, Units(-15));
    }
}
