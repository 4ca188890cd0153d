pub const COOKIE_NAME_POLICY: &str = "CloudFront-Policy";
pub const COOKIE_NAME_KEY_PAIR_ID: &str = "CloudFront-Key-Pair-Id";
pub const COOKIE_NAME_SIGNATURE: &str = "CloudFront-Signature";

/// Signed-cookie triple that authorizes playlist and media requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloudFrontCookie {
    pub policy: String,
    pub key_pair_id: String,
    pub signature: String,
}

impl CloudFrontCookie {
    /// Collects the CloudFront values out of `(name, value)` cookie pairs,
    /// ignoring anything else the CDN sets.
    pub fn from_cookies<'a, I>(cookies: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut cookie = Self::default();
        for (name, value) in cookies {
            match name {
                COOKIE_NAME_POLICY => cookie.policy = value.to_string(),
                COOKIE_NAME_KEY_PAIR_ID => cookie.key_pair_id = value.to_string(),
                COOKIE_NAME_SIGNATURE => cookie.signature = value.to_string(),
                _ => (),
            }
        }
        cookie
    }

    pub fn assigned(&self) -> bool {
        !self.policy.is_empty() && !self.key_pair_id.is_empty() && !self.signature.is_empty()
    }

    pub fn cookie_header(&self) -> String {
        format!(
            "{}={}; {}={}; {}={}",
            COOKIE_NAME_POLICY,
            self.policy,
            COOKIE_NAME_KEY_PAIR_ID,
            self.key_pair_id,
            COOKIE_NAME_SIGNATURE,
            self.signature
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(policy: &str, key_pair_id: &str, signature: &str) -> CloudFrontCookie {
        CloudFrontCookie {
            policy: policy.to_string(),
            key_pair_id: key_pair_id.to_string(),
            signature: signature.to_string(),
        }
    }

    #[test]
    fn assigned() {
        let cases = [
            ("complete", cookie("policy", "keypair", "sig"), true),
            ("empty policy", cookie("", "keypair", "sig"), false),
            ("empty keypair", cookie("policy", "", "sig"), false),
            ("empty signature", cookie("policy", "keypair", ""), false),
            ("default", CloudFrontCookie::default(), false),
        ];

        for (name, c, wanted) in cases {
            assert_eq!(c.assigned(), wanted, "{}", name);
        }
    }

    #[test]
    fn from_cookies() {
        let c = CloudFrontCookie::from_cookies([
            ("AWSALB", "ignored"),
            ("CloudFront-Policy", "eyJTdGF0ZW1lbnQiOltdfQ__"),
            ("CloudFront-Signature", "c2lnbmF0dXJl"),
            ("CloudFront-Key-Pair-Id", "K2JCJMDEHXQW5F"),
        ]);

        assert!(c.assigned());
        assert_eq!(c, cookie("eyJTdGF0ZW1lbnQiOltdfQ__", "K2JCJMDEHXQW5F", "c2lnbmF0dXJl"));
    }

    #[test]
    fn cookie_header() {
        assert_eq!(
            cookie("p", "k", "s").cookie_header(),
            "CloudFront-Policy=p; CloudFront-Key-Pair-Id=k; CloudFront-Signature=s"
        );
    }
}
